//! Headless Router for the dedicated server binary.
//!
//! This is the Host half of the full routing table in isolation: there is no
//! Window collaborator, so every routing table cell that targets Window on
//! the Host column is dropped (logged, for chat) rather than forwarded
//! anywhere — a dedicated server has no local player and nothing to render.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use shared::event::SyncTarget;
use shared::{GameError, PlayerManager, RouterEvent, ServerCommand, WireEvent, WorldWorker};

pub struct Router {
    players: Arc<PlayerManager>,
    world: WorldWorker,
    net: shared::NetworkServer,
}

impl Router {
    pub fn start(bind_addr: String) -> Result<Self, GameError> {
        let players = Arc::new(PlayerManager::new(Instant::now()));
        let world = WorldWorker::spawn(players.clone(), true);
        let net = shared::NetworkServer::spawn(bind_addr, players.clone()).map_err(|_| GameError::CannotHost)?;
        Ok(Router { players, world, net })
    }

    /// Runs forever, pumping events between World and NetworkServer. Only
    /// returns on an unrecoverable channel failure (a collaborator thread
    /// died), which the caller surfaces as a fatal `main` error.
    pub fn run(&mut self) -> Result<(), GameError> {
        loop {
            let mut idle = true;

            match self.net.inbound.try_recv() {
                Ok(event) => {
                    idle = false;
                    self.handle_network_event(event);
                }
                Err(tokio::sync::mpsc::error::TryRecvError::Empty) => {}
                Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => {
                    warn!("NetworkServer thread disconnected");
                    return Err(GameError::CannotHost);
                }
            }

            match self.world.outbound.try_recv() {
                Ok(event) => {
                    idle = false;
                    self.handle_world_event(event);
                }
                Err(std::sync::mpsc::TryRecvError::Empty) => {}
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    warn!("World thread disconnected");
                    return Err(GameError::CannotHost);
                }
            }

            if idle {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        }
    }

    fn handle_network_event(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::AddGameObject { .. } | RouterEvent::RemoveGameObject { .. } => {
                let _ = self.world.inbound.send(event);
            }
            RouterEvent::SwitchPlayer { old_player_id, new_player_id } => {
                match self.players.switch_player(old_player_id, new_player_id) {
                    Ok(()) => {
                        let _ = self.world.inbound.send(RouterEvent::SwitchPlayer { old_player_id, new_player_id });
                        let _ = self.net.outbound.send(ServerCommand::Unicast {
                            player_id: new_player_id,
                            event: WireEvent::SwitchPlayer { old_player_id, new_player_id },
                        });
                    }
                    Err(e) => warn!("rejected SwitchPlayer({old_player_id} -> {new_player_id}): {e}"),
                }
            }
            RouterEvent::Message { player_id, text } => {
                // Network-sourced chat is only ever shown locally, never
                // relayed onward to other clients (see DESIGN.md).
                info!("player {player_id}: {text}");
            }
            RouterEvent::SyncRequest { .. } | RouterEvent::RemovePlayerGameObjects { .. } => {
                let _ = self.world.inbound.send(event);
            }
            other => debug!("dropping network event with no headless-host handling: {other:?}"),
        }
    }

    fn handle_world_event(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::GameObjectSync { sync_id, objects, target: SyncTarget::Network } => {
                let _ = self.net.outbound.send(ServerCommand::Broadcast(WireEvent::GameObjectSync { sync_id, objects }));
            }
            RouterEvent::GameObjectSync { target: SyncTarget::Window, objects, .. } => {
                debug!("render snapshot of {} objects has no window to reach", objects.len());
            }
            RouterEvent::Highscore { scores } => {
                let _ = self.net.outbound.send(ServerCommand::Broadcast(WireEvent::Highscore { scores }));
            }
            other => debug!("dropping world event with no headless-host handling: {other:?}"),
        }
    }
}
