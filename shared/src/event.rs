//! The Router's internal event vocabulary.
//!
//! This is deliberately a larger set than [`crate::protocol::WireEvent`]:
//! purely local events (`SyncRequest`, the render-target `GameObjectSync`)
//! never cross the wire, they only ever travel between in-process component
//! queues. Merge re-entrancy (contacts queued during a physics step, applied
//! between steps) is handled entirely inside `World` itself rather than as
//! a `RouterEvent` variant — see `World`'s `pending_merges` field.

use crate::constants::MAX_PLAYERS;
use crate::protocol::{DisconnectReason, GameObjectState};

/// The role a process is currently playing. Owned exclusively by the Router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    SinglePlay,
    Host,
    Client,
}

/// Which component raised an event, used by the Router's dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Window,
    World,
    Network,
}

/// Distinguishes the two destinations a `GameObjectSync` batch can have:
/// the local render surface, or the outbound replication channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    Window,
    Network,
}

/// Everything that can flow through a component's inbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    AddGameObject {
        player_id: u16,
        radius: f32,
        position: (f32, f32),
        velocity: (f32, f32),
    },
    RemoveGameObject {
        player_id: u16,
        object_id: u16,
    },
    /// Cosmetic-on-client, authoritative-on-host removal of whatever lies
    /// under a world-space point (the mouse cursor, projected into arena
    /// coordinates by the Window collaborator).
    RemoveNearMouse {
        position: (f32, f32),
        pick_radius: f32,
    },
    SwitchPlayer {
        old_player_id: u16,
        new_player_id: u16,
    },
    Message {
        player_id: u16,
        text: String,
    },
    GameObjectSync {
        sync_id: u32,
        objects: Vec<GameObjectState>,
        target: SyncTarget,
    },
    SyncRequest {
        sync_id: u32,
    },
    RemovePlayerGameObjects {
        player_id: u16,
    },
    Connected {
        player_id: u16,
    },
    Disconnected {
        reason: DisconnectReason,
    },
    Highscore {
        scores: [i32; MAX_PLAYERS],
    },
}
