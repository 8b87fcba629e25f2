//! Client-side UDP endpoint: handshake, keepalive and inbound dispatch.
//!
//! Mirrors `shared::net_server`'s shape (its own thread, its own
//! single-threaded Tokio runtime, plain `tokio::sync::mpsc` channels usable
//! from synchronous code) but the two aren't merged into one module because
//! nothing outside the client binary ever needs a `NetworkClient`.

use std::net::{SocketAddr, ToSocketAddrs};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{info, warn};
use shared::constants::*;
use shared::{CodecError, GameError, RouterEvent, SyncTarget, WireEvent};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub enum ClientCommand {
    Send(WireEvent),
    Shutdown,
}

pub struct NetworkClient {
    pub inbound: mpsc::UnboundedReceiver<RouterEvent>,
    /// A fatal, locally-detected condition (handshake timeout, watchdog
    /// expiry) that isn't itself a wire event and so doesn't fit
    /// `RouterEvent::Disconnected`'s wire-sourced `DisconnectReason`.
    pub fatal: mpsc::UnboundedReceiver<GameError>,
    pub outbound: mpsc::UnboundedSender<ClientCommand>,
    thread: Option<JoinHandle<()>>,
}

impl NetworkClient {
    pub fn spawn(server_addr: String) -> Result<Self, GameError> {
        let resolved = resolve(&server_addr)?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let thread = std::thread::Builder::new()
            .name("net-client".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to start NetworkClient runtime");
                runtime.block_on(run(resolved, inbound_tx, fatal_tx, outbound_rx));
            })
            .expect("failed to spawn net-client thread");

        Ok(NetworkClient {
            inbound: inbound_rx,
            fatal: fatal_rx,
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

fn resolve(addr_str: &str) -> Result<SocketAddr, GameError> {
    if let Ok(addr) = addr_str.parse::<SocketAddr>() {
        return Ok(addr);
    }
    addr_str
        .to_socket_addrs()
        .map_err(GameError::Network)?
        .next()
        .ok_or(GameError::CannotConnect)
}

async fn run(
    server_addr: SocketAddr,
    inbound_tx: mpsc::UnboundedSender<RouterEvent>,
    fatal_tx: mpsc::UnboundedSender<GameError>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientCommand>,
) {
    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket,
        Err(e) => {
            let _ = fatal_tx.send(GameError::Network(e));
            return;
        }
    };

    send(&socket, server_addr, &WireEvent::Hello { build_hash: shared::build_hash() }).await;

    let mut connected = false;
    let mut last_received = Instant::now();
    let mut buf = [0u8; MAX_PACKET_SIZE];

    let mut ping_tick = tokio::time::interval(Duration::from_millis(PING_RATE_MS));
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut watchdog_tick = tokio::time::interval(Duration::from_millis(PING_RATE_MS));
    watchdog_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, from) = match received {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("NetworkClient recv error: {e}");
                        continue;
                    }
                };
                if from != server_addr {
                    continue;
                }
                match WireEvent::decode(&buf[..len]) {
                    Ok(event) => {
                        last_received = Instant::now();
                        if matches!(event, WireEvent::Connected { .. }) {
                            connected = true;
                        }
                        dispatch(event, &inbound_tx);
                    }
                    Err(CodecError::UnknownTag(tag)) => warn!("ignoring unknown tag {tag:#x} from host"),
                    Err(e) => warn!("malformed packet from host: {e}"),
                }
            }

            command = outbound_rx.recv() => {
                match command {
                    Some(ClientCommand::Shutdown) | None => {
                        info!("NetworkClient shutting down");
                        break;
                    }
                    Some(ClientCommand::Send(event)) => send(&socket, server_addr, &event).await,
                }
            }

            _ = ping_tick.tick() => {
                send(&socket, server_addr, &WireEvent::Ping).await;
            }

            _ = watchdog_tick.tick() => {
                if last_received.elapsed() > Duration::from_millis(CONNECTION_TIMEOUT_MS) {
                    let error = if connected { GameError::ConnectionTimedOut } else { GameError::CannotConnect };
                    let _ = fatal_tx.send(error);
                    break;
                }
            }
        }
    }
}

/// Forwards the subset of wire events the client is specified to accept
/// (§4.4): anything else — including `Highscore`, which the host does
/// broadcast — is dropped here exactly as the inbound dispatch contract
/// describes, not "fixed" to also handle it.
fn dispatch(event: WireEvent, inbound_tx: &mpsc::UnboundedSender<RouterEvent>) {
    let forwarded = match event {
        WireEvent::Connected { player_id } => Some(RouterEvent::Connected { player_id }),
        WireEvent::Disconnected { reason } => Some(RouterEvent::Disconnected { reason }),
        WireEvent::SwitchPlayer { old_player_id, new_player_id } => {
            Some(RouterEvent::SwitchPlayer { old_player_id, new_player_id })
        }
        WireEvent::Message { player_id, text } => Some(RouterEvent::Message { player_id, text }),
        WireEvent::GameObjectSync { sync_id, objects } => {
            Some(RouterEvent::GameObjectSync { sync_id, objects, target: SyncTarget::Network })
        }
        WireEvent::Hello { .. } | WireEvent::Ping | WireEvent::AddGameObject { .. } | WireEvent::RemoveGameObject { .. } | WireEvent::Highscore { .. } => None,
    };
    if let Some(event) = forwarded {
        let _ = inbound_tx.send(event);
    }
}

async fn send(socket: &UdpSocket, addr: SocketAddr, event: &WireEvent) {
    let bytes = event.encode();
    if let Err(e) = socket.send_to(&bytes, addr).await {
        warn!("failed to send to {addr}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_accepts_direct_socket_addr() {
        let addr = resolve("127.0.0.1:12345").unwrap();
        assert_eq!(addr.port(), 12345);
    }

    #[test]
    fn resolve_accepts_localhost_hostname() {
        let addr = resolve("localhost:12345").unwrap();
        assert_eq!(addr.port(), 12345);
    }

    #[test]
    fn resolve_rejects_garbage() {
        assert!(resolve("not a host").is_err());
    }
}
