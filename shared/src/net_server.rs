//! Host-side UDP endpoint: session admission, per-event authorization,
//! timeout eviction and the periodic sync tick that drives World's
//! replication snapshots.
//!
//! Runs on its own OS thread with a dedicated single-threaded Tokio runtime,
//! so neither the Router nor World ever need to be inside an async context
//! to talk to it: [`NetworkServer::inbound`] and [`NetworkServer::outbound`]
//! are plain `tokio::sync::mpsc` unbounded channels, whose `try_recv`/`send`
//! work from ordinary synchronous code.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::constants::*;
use crate::entities::PlayerManager;
use crate::event::RouterEvent;
use crate::protocol::{CodecError, DisconnectReason, WireEvent};

/// Outbound instruction posted by the Router onto [`NetworkServer::outbound`].
#[derive(Debug, Clone)]
pub enum ServerCommand {
    /// Sent to every admitted session.
    Broadcast(WireEvent),
    /// Sent to the single session currently holding `player_id`, if any.
    Unicast { player_id: u16, event: WireEvent },
    Shutdown,
}

struct Session {
    addr: SocketAddr,
    player_id: u16,
    last_seen: Instant,
}

/// A running host-side network endpoint. Dropping this does not stop the
/// worker thread by itself; send [`ServerCommand::Shutdown`] first.
pub struct NetworkServer {
    pub inbound: mpsc::UnboundedReceiver<RouterEvent>,
    pub outbound: mpsc::UnboundedSender<ServerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl NetworkServer {
    /// Binds `bind_addr` and starts the worker thread. Returns once the
    /// socket is bound; admission and the sync tick run in the background.
    pub fn spawn(bind_addr: String, players: Arc<PlayerManager>) -> std::io::Result<Self> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("net-server".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to start NetworkServer runtime");
                runtime.block_on(async move {
                    match UdpSocket::bind(&bind_addr).await {
                        Ok(socket) => {
                            info!("NetworkServer listening on {bind_addr}");
                            let _ = ready_tx.send(Ok(()));
                            run(socket, players, inbound_tx, outbound_rx).await;
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                        }
                    }
                });
            })
            .expect("failed to spawn net-server thread");

        ready_rx
            .recv()
            .expect("net-server thread dropped its ready signal")?;

        Ok(NetworkServer {
            inbound: inbound_rx,
            outbound: outbound_tx,
            thread: Some(thread),
        })
    }

    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn run(
    socket: UdpSocket,
    players: Arc<PlayerManager>,
    inbound_tx: mpsc::UnboundedSender<RouterEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerCommand>,
) {
    let mut sessions: Vec<Session> = Vec::with_capacity(MAX_PLAYERS);
    let mut buf = [0u8; MAX_PACKET_SIZE];

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5EED);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut sync_tick = tokio::time::interval(Duration::from_millis(SYNC_RATE_MS));
    sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut timeout_tick = tokio::time::interval(Duration::from_millis(PING_RATE_MS));
    timeout_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, addr) = match received {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("NetworkServer recv error: {e}");
                        continue;
                    }
                };
                handle_datagram(&buf[..len], addr, &socket, &players, &mut sessions, &inbound_tx).await;
            }

            command = outbound_rx.recv() => {
                match command {
                    Some(ServerCommand::Shutdown) | None => {
                        info!("NetworkServer shutting down");
                        break;
                    }
                    Some(cmd) => handle_command(cmd, &socket, &sessions).await,
                }
            }

            _ = sync_tick.tick() => {
                let sync_id = rng.gen::<u32>();
                debug!("emitting SyncRequest({sync_id}) to {} sessions", sessions.len());
                let _ = inbound_tx.send(RouterEvent::SyncRequest { sync_id });
            }

            _ = timeout_tick.tick() => {
                check_timeouts(&players, &mut sessions, &inbound_tx, Instant::now());
            }
        }
    }
}

async fn handle_datagram(
    bytes: &[u8],
    addr: SocketAddr,
    socket: &UdpSocket,
    players: &Arc<PlayerManager>,
    sessions: &mut Vec<Session>,
    inbound_tx: &mpsc::UnboundedSender<RouterEvent>,
) {
    if let Some(index) = sessions.iter().position(|s| s.addr == addr) {
        let event = match WireEvent::decode(bytes) {
            Ok(event) => event,
            Err(e) => {
                warn!("malformed packet from {addr}: {e}");
                return;
            }
        };
        sessions[index].last_seen = Instant::now();
        players.touch(sessions[index].player_id, Instant::now());
        dispatch_authenticated(sessions[index].player_id, event, inbound_tx);
        return;
    }

    try_handshake(bytes, addr, socket, players, sessions).await;
}

/// Admits or rejects a session based on a `Hello` from an unrecognized
/// address. Any other event type from an unknown address is silently
/// ignored rather than treated as an error: an attacker or a stray packet
/// shouldn't be able to elicit a reply without first proving it speaks the
/// protocol.
async fn try_handshake(
    bytes: &[u8],
    addr: SocketAddr,
    socket: &UdpSocket,
    players: &Arc<PlayerManager>,
    sessions: &mut Vec<Session>,
) {
    let event = match WireEvent::decode(bytes) {
        Ok(event) => event,
        Err(CodecError::UnknownTag(tag)) => {
            debug!("ignoring unknown tag {tag:#x} from unadmitted {addr}");
            return;
        }
        Err(e) => {
            debug!("ignoring malformed handshake attempt from {addr}: {e}");
            return;
        }
    };

    let WireEvent::Hello { build_hash } = event else {
        debug!("ignoring non-Hello packet from unadmitted {addr}");
        return;
    };

    if build_hash != crate::protocol::build_hash() {
        info!("rejecting {addr}: incompatible build hash");
        send_to(socket, addr, &WireEvent::Disconnected { reason: DisconnectReason::Compatibility }).await;
        return;
    }

    match players.add_player(Instant::now()) {
        Ok(player_id) => {
            info!("admitted {addr} as player {player_id}");
            sessions.push(Session { addr, player_id, last_seen: Instant::now() });
            send_to(socket, addr, &WireEvent::Connected { player_id }).await;
        }
        Err(_) => {
            info!("rejecting {addr}: server full");
            send_to(socket, addr, &WireEvent::Disconnected { reason: DisconnectReason::ServerFull }).await;
        }
    }
}

/// Translates an authenticated wire event into the Router's internal
/// vocabulary, dropping anything whose `player_id` doesn't match the
/// sending session (§4.3.1) and anything the server only ever sends, never
/// receives (`Connected`, `Disconnected`, `Highscore`, `GameObjectSync`).
fn dispatch_authenticated(session_player_id: u16, event: WireEvent, inbound_tx: &mpsc::UnboundedSender<RouterEvent>) {
    let forwarded = match event {
        WireEvent::Ping | WireEvent::Hello { .. } => None,
        WireEvent::AddGameObject { player_id, radius, position_x, position_y, velocity_x, velocity_y } => {
            check_auth(session_player_id, player_id).then_some(RouterEvent::AddGameObject {
                player_id,
                radius,
                position: (position_x, position_y),
                velocity: (velocity_x, velocity_y),
            })
        }
        WireEvent::RemoveGameObject { player_id, object_id } => {
            check_auth(session_player_id, player_id).then_some(RouterEvent::RemoveGameObject { player_id, object_id })
        }
        WireEvent::SwitchPlayer { old_player_id, new_player_id } => {
            check_auth(session_player_id, old_player_id).then_some(RouterEvent::SwitchPlayer { old_player_id, new_player_id })
        }
        WireEvent::Message { player_id, text } => {
            check_auth(session_player_id, player_id).then_some(RouterEvent::Message { player_id, text })
        }
        WireEvent::Connected { .. } | WireEvent::Disconnected { .. } | WireEvent::Highscore { .. } | WireEvent::GameObjectSync { .. } => {
            warn!("ignoring server-only event type received from player {session_player_id}");
            None
        }
    };

    if let Some(event) = forwarded {
        let _ = inbound_tx.send(event);
    }
}

/// `false` means the event's claimed `player_id` didn't match the sending
/// session; logs and signals the caller to drop it (§4.3.1).
fn check_auth(session_player_id: u16, claimed_player_id: u16) -> bool {
    let ok = session_player_id == claimed_player_id;
    if !ok {
        warn!("dropping event from player {session_player_id} claiming player_id {claimed_player_id}");
    }
    ok
}

fn check_timeouts(
    players: &Arc<PlayerManager>,
    sessions: &mut Vec<Session>,
    inbound_tx: &mpsc::UnboundedSender<RouterEvent>,
    now: Instant,
) {
    let timeout = Duration::from_millis(CONNECTION_TIMEOUT_MS);
    let mut i = 0;
    while i < sessions.len() {
        if now.duration_since(sessions[i].last_seen) > timeout {
            let session = sessions.remove(i);
            info!("player {} timed out", session.player_id);
            players.remove_player(session.player_id);
            let _ = inbound_tx.send(RouterEvent::RemovePlayerGameObjects { player_id: session.player_id });
        } else {
            i += 1;
        }
    }
}

async fn handle_command(command: ServerCommand, socket: &UdpSocket, sessions: &[Session]) {
    match command {
        ServerCommand::Broadcast(event) => {
            for session in sessions {
                send_to(socket, session.addr, &event).await;
            }
        }
        ServerCommand::Unicast { player_id, event } => {
            if let Some(session) = sessions.iter().find(|s| s.player_id == player_id) {
                send_to(socket, session.addr, &event).await;
            } else {
                warn!("unicast to unknown player {player_id} dropped");
            }
        }
        ServerCommand::Shutdown => {}
    }
}

async fn send_to(socket: &UdpSocket, addr: SocketAddr, event: &WireEvent) {
    let bytes = event.encode();
    if let Err(e) = socket.send_to(&bytes, addr).await {
        warn!("failed to send to {addr}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_auth_matches_only_identical_player_id() {
        assert!(check_auth(3, 3));
        assert!(!check_auth(3, 4));
    }

    #[tokio::test]
    async fn handshake_rejects_mismatched_build_hash() {
        let players = Arc::new(PlayerManager::new(Instant::now()));
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let mut sessions = Vec::new();
        let hello = WireEvent::Hello { build_hash: 0 }.encode();
        try_handshake(&hello, addr, &socket, &players, &mut sessions).await;
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn handshake_admits_matching_build_hash() {
        let players = Arc::new(PlayerManager::new(Instant::now()));
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = "127.0.0.1:2".parse().unwrap();
        let mut sessions = Vec::new();
        let hello = WireEvent::Hello { build_hash: crate::protocol::build_hash() }.encode();
        try_handshake(&hello, addr, &socket, &players, &mut sessions).await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].player_id != SYSTEM_PLAYER_ID);
    }

    #[test]
    fn check_timeouts_evicts_stale_sessions_and_notifies_router() {
        let players = Arc::new(PlayerManager::new(Instant::now()));
        let player_id = players.add_player(Instant::now()).unwrap();
        let mut sessions = vec![Session {
            addr: "127.0.0.1:3".parse().unwrap(),
            player_id,
            last_seen: Instant::now() - Duration::from_secs(10),
        }];
        let (tx, mut rx) = mpsc::unbounded_channel();
        check_timeouts(&players, &mut sessions, &tx, Instant::now());
        assert!(sessions.is_empty());
        assert!(!players.is_connected(player_id));
        assert!(matches!(rx.try_recv(), Ok(RouterEvent::RemovePlayerGameObjects { player_id: p }) if p == player_id));
    }
}
