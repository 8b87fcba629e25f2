//! Crate-level error type.
//!
//! Every component boundary returns `Result<T, GameError>`; only `main` and
//! the top-level `run` loops widen to `Box<dyn std::error::Error>` the way
//! the rest of this codebase's binaries already do.

use std::fmt;

use crate::protocol::DisconnectReason;

#[derive(Debug)]
pub enum GameError {
    /// No free non-system player slot was available.
    ServerFull,
    /// A `SwitchPlayer` target slot was already occupied.
    SlotOccupied { player_id: u16 },
    /// An event referenced a player slot that does not exist or is unoccupied.
    UnknownPlayer { player_id: u16 },
    /// An event referenced a GameObject slot that does not exist.
    UnknownGameObject { player_id: u16, object_id: u16 },
    /// A client's `Hello.build_hash` did not match the host's.
    IncompatibleBuild,
    /// The peer closed the session or was dropped for inactivity.
    Disconnected(DisconnectReason),
    /// The handshake watchdog elapsed before any `Connected` arrived.
    CannotConnect,
    /// The handshake watchdog elapsed after an established session went quiet.
    ConnectionTimedOut,
    /// A dedicated or self-hosted server failed to bind its listening socket.
    CannotHost,
    /// Could not resolve the requested network address, or an I/O error
    /// occurred that isn't one of the named contractual failures above.
    Network(std::io::Error),
    /// A datagram failed to decode.
    Codec(crate::protocol::CodecError),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::ServerFull => write!(f, "Server full"),
            GameError::SlotOccupied { player_id } => {
                write!(f, "player slot {player_id} is already occupied")
            }
            GameError::UnknownPlayer { player_id } => {
                write!(f, "unknown player {player_id}")
            }
            GameError::UnknownGameObject { player_id, object_id } => {
                write!(f, "unknown game object {object_id} owned by player {player_id}")
            }
            GameError::IncompatibleBuild => {
                write!(f, "This version is not compatible with the server")
            }
            GameError::Disconnected(reason) => write!(f, "{}", reason.message()),
            GameError::CannotConnect => write!(f, "Cannot connect to server"),
            GameError::ConnectionTimedOut => write!(f, "Connection timed out"),
            GameError::CannotHost => write!(f, "Cannot host game"),
            GameError::Network(e) => write!(f, "network error: {e}"),
            GameError::Codec(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GameError::Network(e) => Some(e),
            GameError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GameError {
    fn from(e: std::io::Error) -> Self {
        GameError::Network(e)
    }
}

impl From<crate::protocol::CodecError> for GameError {
    fn from(e: crate::protocol::CodecError) -> Self {
        GameError::Codec(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_reason_messages_match_user_facing_text() {
        assert_eq!(
            GameError::Disconnected(DisconnectReason::ServerFull).to_string(),
            "Server full"
        );
        assert_eq!(
            GameError::Disconnected(DisconnectReason::Compatibility).to_string(),
            "This version is not compatible with the server"
        );
    }
}
