//! The interactive client's Router: owns the `GameMode` state machine and
//! dispatches events per the routing table between Window, World and
//! Network, the same table the dedicated [`server::router::Router`]
//! implements the Host-only half of.
//!
//! Unlike the dedicated server, this Router has a Window collaborator: it is
//! driven synchronously from the macroquad main loop rather than from its
//! own thread, so [`Router::poll`] is called once per frame to drain
//! whatever World/Network posted since the last call, and
//! [`Router::handle_window`] is called for every input intent the frame's
//! input sampling raised.

use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use shared::constants::SYSTEM_PLAYER_ID;
use shared::event::SyncTarget;
use shared::{GameError, GameMode, PlayerManager, RouterEvent, ServerCommand, WireEvent, WorldWorker};

use crate::net_client::{ClientCommand, NetworkClient};

/// A chat-line, mode-switch or exit request raised locally by the Window.
#[derive(Debug, Clone)]
pub enum Command {
    Single,
    Host(Option<u16>),
    Connect(String),
    Player(u16),
    AdminEnable,
    AdminDisable,
}

/// Parses a `/`-prefixed chat line into a [`Command`]; `None` for anything
/// else, which callers treat as ordinary chat text.
pub fn parse_command(text: &str) -> Option<Command> {
    if let Some(rest) = text.strip_prefix("/host ") {
        return rest.trim().parse::<u16>().ok().map(|p| Command::Host(Some(p)));
    }
    match text.trim() {
        "/single" => Some(Command::Single),
        "/host" => Some(Command::Host(None)),
        "/admin enable" => Some(Command::AdminEnable),
        "/admin disable" => Some(Command::AdminDisable),
        other => {
            if let Some(rest) = other.strip_prefix("/connect ") {
                Some(Command::Connect(rest.trim().to_string()))
            } else if let Some(rest) = other.strip_prefix("/player ") {
                rest.trim().parse::<u16>().ok().map(Command::Player)
            } else {
                None
            }
        }
    }
}

/// A fatal condition the Window must surface and then terminate the process
/// for (§7: any fatal condition on the client calls `exit(-1, message)`).
#[derive(Debug, Clone)]
pub struct Fatal(pub String);

pub struct Router {
    mode: GameMode,
    players: Arc<PlayerManager>,
    world: WorldWorker,
    net_server: Option<shared::NetworkServer>,
    net_client: Option<NetworkClient>,
    /// The slot actually registered for this process in `PlayerManager`.
    local_player_id: u16,
    /// The `player_id` new Window-sourced events are attributed to; equal to
    /// `local_player_id` except while `/admin enable` is toggled on, when it
    /// is temporarily the system slot without touching `PlayerManager`.
    acting_player_id: u16,
    pub chat_log: Vec<String>,
    pub scores: [i32; shared::constants::MAX_PLAYERS],
    pub render_objects: Vec<shared::GameObjectState>,
    pub fatal: Option<Fatal>,
}

impl Router {
    pub fn new() -> Self {
        let now = Instant::now();
        let players = Arc::new(PlayerManager::new(now));
        let world = WorldWorker::spawn(players.clone(), true);
        let local_player_id = players.add_player(now).expect("fresh PlayerManager has free slots");
        Router {
            mode: GameMode::SinglePlay,
            players,
            world,
            net_server: None,
            net_client: None,
            local_player_id,
            acting_player_id: local_player_id,
            chat_log: Vec::new(),
            scores: [0; shared::constants::MAX_PLAYERS],
            render_objects: Vec::new(),
            fatal: None,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn local_player_id(&self) -> u16 {
        self.local_player_id
    }

    /// `setMode`: stop whatever workers are running, reset `PlayerManager`,
    /// then start the worker set the new mode needs. Command-triggered
    /// transitions reach here already off the input-sampling call stack, so
    /// there is no self-deadlock risk in starting the new workers inline.
    pub fn set_mode(&mut self, mode: GameMode, endpoint: Option<String>) {
        if let Some(mut net_server) = self.net_server.take() {
            let _ = net_server.outbound.send(ServerCommand::Shutdown);
            net_server.join();
        }
        if let Some(mut net_client) = self.net_client.take() {
            let _ = net_client.outbound.send(ClientCommand::Shutdown);
            net_client.join();
        }

        let now = Instant::now();
        self.players = Arc::new(PlayerManager::new(now));
        self.chat_log.clear();

        match mode {
            GameMode::SinglePlay => {
                self.world = WorldWorker::spawn(self.players.clone(), true);
                self.local_player_id = self.players.add_player(now).expect("fresh PlayerManager has free slots");
            }
            GameMode::Host => {
                self.world = WorldWorker::spawn(self.players.clone(), true);
                self.local_player_id = self.players.add_player(now).expect("fresh PlayerManager has free slots");
                let port = endpoint.and_then(|e| e.parse().ok()).unwrap_or(shared::constants::PORT);
                let bind_addr = format!("0.0.0.0:{port}");
                match shared::NetworkServer::spawn(bind_addr, self.players.clone()) {
                    Ok(net_server) => self.net_server = Some(net_server),
                    Err(e) => {
                        self.fatal = Some(Fatal(format!("Cannot host game: {e}")));
                        return;
                    }
                }
            }
            GameMode::Client => {
                self.world = WorldWorker::spawn(self.players.clone(), false);
                // Not yet registered: held at the system slot until the
                // host's `Connected` reply names the real one.
                self.local_player_id = SYSTEM_PLAYER_ID;
                match NetworkClient::spawn(endpoint.expect("Client mode requires a server address")) {
                    Ok(net_client) => self.net_client = Some(net_client),
                    Err(e) => {
                        self.fatal = Some(Fatal(format!("Cannot connect to server: {e}")));
                        return;
                    }
                }
            }
        }

        self.acting_player_id = self.local_player_id;
        self.mode = mode;
        info!("mode switched to {mode:?}");
    }

    /// Call once per frame; drains everything World and Network posted
    /// since the previous call and applies the routing table's World- and
    /// Network-sourced rows.
    pub fn poll(&mut self) {
        while let Ok(event) = self.world.outbound.try_recv() {
            self.handle_world_event(event);
        }

        if self.net_server.is_some() {
            loop {
                let event = {
                    let net_server = self.net_server.as_mut().unwrap();
                    net_server.inbound.try_recv()
                };
                match event {
                    Ok(event) => self.handle_network_event_as_host(event),
                    Err(_) => break,
                }
            }
        }

        if self.net_client.is_some() {
            loop {
                let event = {
                    let net_client = self.net_client.as_mut().unwrap();
                    net_client.inbound.try_recv()
                };
                match event {
                    Ok(event) => self.handle_network_event_as_client(event),
                    Err(_) => break,
                }
            }
            loop {
                let fatal = {
                    let net_client = self.net_client.as_mut().unwrap();
                    net_client.fatal.try_recv()
                };
                match fatal {
                    Ok(err) => {
                        self.fatal = Some(Fatal(err.to_string()));
                        break;
                    }
                    Err(_) => break,
                }
            }
        }
    }

    /// Intercepts a typed chat line as a command, or routes it as ordinary
    /// chat text per the Message|Window row.
    pub fn handle_chat(&mut self, text: String) {
        if let Some(command) = parse_command(&text) {
            self.run_command(command);
            return;
        }
        self.chat_log.push(format!("you: {text}"));
        match self.mode {
            GameMode::SinglePlay => {}
            GameMode::Host => {
                if let Some(net_server) = &self.net_server {
                    let _ = net_server.outbound.send(ServerCommand::Broadcast(WireEvent::Message {
                        player_id: self.acting_player_id,
                        text,
                    }));
                }
            }
            GameMode::Client => {
                if let Some(net_client) = &self.net_client {
                    let _ = net_client.outbound.send(ClientCommand::Send(WireEvent::Message {
                        player_id: self.local_player_id,
                        text,
                    }));
                }
            }
        }
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Single => self.set_mode(GameMode::SinglePlay, None),
            Command::Host(port) => self.set_mode(GameMode::Host, port.map(|p| p.to_string())),
            Command::Connect(endpoint) => self.set_mode(GameMode::Client, Some(endpoint)),
            Command::Player(new_id) => self.handle_window(RouterEvent::SwitchPlayer { old_player_id: self.local_player_id, new_player_id: new_id }),
            Command::AdminEnable if self.mode != GameMode::Client => self.acting_player_id = SYSTEM_PLAYER_ID,
            Command::AdminDisable if self.mode != GameMode::Client => self.acting_player_id = self.local_player_id,
            Command::AdminEnable | Command::AdminDisable => warn!("/admin is not available while connected as a client"),
        }
    }

    /// Window-sourced input intent (`AddGameObject`, `RemoveGameObject`,
    /// `RemoveNearMouse`, `SwitchPlayer`), stamped with `acting_player_id`.
    pub fn handle_window(&mut self, event: RouterEvent) {
        let event = self.stamp(event);
        match self.mode {
            GameMode::SinglePlay => match event {
                RouterEvent::SwitchPlayer { old_player_id, new_player_id } => self.apply_switch_player(old_player_id, new_player_id),
                other => self.forward_to_world(other),
            },
            GameMode::Host => match event {
                RouterEvent::SwitchPlayer { old_player_id, new_player_id } => self.apply_switch_player(old_player_id, new_player_id),
                other => self.forward_to_world(other),
            },
            GameMode::Client => match event {
                RouterEvent::RemoveNearMouse { .. } => self.forward_to_world(event),
                RouterEvent::SwitchPlayer { old_player_id, new_player_id } => {
                    if let Some(net_client) = &self.net_client {
                        let _ = net_client.outbound.send(ClientCommand::Send(WireEvent::SwitchPlayer { old_player_id, new_player_id }));
                    }
                }
                RouterEvent::AddGameObject { player_id, radius, position, velocity } => {
                    if let Some(net_client) = &self.net_client {
                        let _ = net_client.outbound.send(ClientCommand::Send(WireEvent::AddGameObject {
                            player_id,
                            radius,
                            position_x: position.0,
                            position_y: position.1,
                            velocity_x: velocity.0,
                            velocity_y: velocity.1,
                        }));
                    }
                }
                RouterEvent::RemoveGameObject { player_id, object_id } => {
                    if let Some(net_client) = &self.net_client {
                        let _ = net_client.outbound.send(ClientCommand::Send(WireEvent::RemoveGameObject { player_id, object_id }));
                    }
                }
                other => warn!("unrouted Window event in Client mode: {other:?}"),
            },
        }
    }

    fn stamp(&self, event: RouterEvent) -> RouterEvent {
        match event {
            RouterEvent::AddGameObject { radius, position, velocity, .. } => {
                RouterEvent::AddGameObject { player_id: self.acting_player_id, radius, position, velocity }
            }
            RouterEvent::RemoveGameObject { object_id, .. } => RouterEvent::RemoveGameObject { player_id: self.acting_player_id, object_id },
            RouterEvent::RemoveNearMouse { position, pick_radius } => RouterEvent::RemoveNearMouse { position, pick_radius },
            other => other,
        }
    }

    fn forward_to_world(&self, event: RouterEvent) {
        let _ = self.world.inbound.send(event);
    }

    fn apply_switch_player(&mut self, old_player_id: u16, new_player_id: u16) {
        match self.players.switch_player(old_player_id, new_player_id) {
            Ok(()) => {
                if old_player_id == self.local_player_id {
                    self.local_player_id = new_player_id;
                    self.acting_player_id = new_player_id;
                }
                self.forward_to_world(RouterEvent::SwitchPlayer { old_player_id, new_player_id });
                if let Some(net_server) = &self.net_server {
                    let _ = net_server.outbound.send(ServerCommand::Unicast {
                        player_id: new_player_id,
                        event: WireEvent::SwitchPlayer { old_player_id, new_player_id },
                    });
                }
            }
            Err(e) => warn!("rejected SwitchPlayer({old_player_id} -> {new_player_id}): {e}"),
        }
    }

    fn handle_world_event(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::GameObjectSync { objects, target: SyncTarget::Window, .. } => {
                self.render_objects = objects;
            }
            RouterEvent::GameObjectSync { sync_id, objects, target: SyncTarget::Network } => {
                if let Some(net_server) = &self.net_server {
                    let _ = net_server.outbound.send(ServerCommand::Broadcast(WireEvent::GameObjectSync { sync_id, objects }));
                }
            }
            RouterEvent::Highscore { scores } => {
                self.scores = scores;
                if let Some(net_server) = &self.net_server {
                    let _ = net_server.outbound.send(ServerCommand::Broadcast(WireEvent::Highscore { scores }));
                }
            }
            other => warn!("unrouted World event: {other:?}"),
        }
    }

    /// Host-column, Network-sourced rows: mirrors the dedicated server's
    /// headless routing, plus chat is shown locally instead of only logged.
    fn handle_network_event_as_host(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::AddGameObject { .. } | RouterEvent::RemoveGameObject { .. } => self.forward_to_world(event),
            RouterEvent::SwitchPlayer { old_player_id, new_player_id } => self.apply_switch_player(old_player_id, new_player_id),
            RouterEvent::Message { player_id, text } => self.chat_log.push(format!("player {player_id}: {text}")),
            RouterEvent::SyncRequest { .. } | RouterEvent::RemovePlayerGameObjects { .. } => self.forward_to_world(event),
            other => warn!("dropping network event with no Host handling: {other:?}"),
        }
    }

    /// Client-column, Network-sourced rows.
    fn handle_network_event_as_client(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::Connected { player_id } => {
                self.local_player_id = player_id;
                self.acting_player_id = player_id;
                self.chat_log.push(format!("connected as player {player_id}"));
            }
            RouterEvent::Disconnected { reason } => {
                self.fatal = Some(Fatal(reason.message().to_string()));
            }
            RouterEvent::SwitchPlayer { new_player_id, .. } => {
                self.local_player_id = new_player_id;
                self.acting_player_id = new_player_id;
                self.chat_log.push(format!("you're now player {new_player_id}"));
            }
            RouterEvent::Message { player_id, text } => self.chat_log.push(format!("player {player_id}: {text}")),
            RouterEvent::GameObjectSync { target: SyncTarget::Network, .. } => self.forward_to_world(event),
            other => warn!("unrouted Network event in Client mode: {other:?}"),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Router::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_commands() {
        assert!(matches!(parse_command("/single"), Some(Command::Single)));
        assert!(matches!(parse_command("/host"), Some(Command::Host(None))));
        assert!(matches!(parse_command("/host 9000"), Some(Command::Host(Some(9000)))));
        assert!(matches!(parse_command("/connect 127.0.0.1:9000"), Some(Command::Connect(addr)) if addr == "127.0.0.1:9000"));
        assert!(matches!(parse_command("/player 3"), Some(Command::Player(3))));
        assert!(matches!(parse_command("/admin enable"), Some(Command::AdminEnable)));
        assert!(matches!(parse_command("/admin disable"), Some(Command::AdminDisable)));
    }

    #[test]
    fn ordinary_chat_is_not_a_command() {
        assert!(parse_command("hello there").is_none());
        assert!(parse_command("/unknown").is_none());
    }

    #[test]
    fn new_router_starts_in_single_play_with_a_registered_local_player() {
        let router = Router::new();
        assert_eq!(router.mode(), GameMode::SinglePlay);
        assert_ne!(router.local_player_id(), SYSTEM_PLAYER_ID);
    }

    #[test]
    fn admin_enable_retargets_acting_player_without_touching_player_manager() {
        let mut router = Router::new();
        let local = router.local_player_id();
        router.run_command(Command::AdminEnable);
        assert_eq!(router.acting_player_id, SYSTEM_PLAYER_ID);
        assert_eq!(router.local_player_id(), local);
        router.run_command(Command::AdminDisable);
        assert_eq!(router.acting_player_id, local);
    }
}
