//! # Dedicated Server Library
//!
//! A dedicated server is the Host role running headless: there is no Window
//! collaborator, so [`router::Router`] is the Host half of the routing table
//! with every Window-targeted cell dropped (logged, never rendered).
//!
//! ## Architecture
//!
//! Three components run concurrently:
//!
//! - [`shared::WorldWorker`] — owns the authoritative physics simulation on
//!   its own OS thread.
//! - [`shared::NetworkServer`] — the UDP endpoint, handshake and per-session
//!   bookkeeping, on its own OS thread with a dedicated Tokio runtime.
//! - [`router::Router`] — pumps events between the two, applying the parts
//!   of the routing table that don't need a local player.
//!
//! All three talk to each other exclusively through `mpsc` channels; nothing
//! here reaches into another component's internal state directly.

pub mod router;

pub use router::Router;
