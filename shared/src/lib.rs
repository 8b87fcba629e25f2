//! Types and wire protocol shared by the host and client binaries.

pub mod constants;
pub mod entities;
pub mod error;
pub mod event;
pub mod net_server;
pub mod physics;
pub mod protocol;
pub mod world;
pub mod world_worker;

pub use entities::{GameObject, Player, PlayerManager};
pub use error::GameError;
pub use event::{GameMode, RouterEvent, Source, SyncTarget};
pub use net_server::{NetworkServer, ServerCommand};
pub use protocol::{build_hash, CodecError, DisconnectReason, GameObjectState, WireEvent};
pub use world::World;
pub use world_worker::WorldWorker;
