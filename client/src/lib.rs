//! Interactive client library: input capture, local routing, and rendering
//! for the gravity-merge arena game.
//!
//! The client embeds the same [`shared::World`] and wire protocol the
//! dedicated server does; the difference is purely which [`shared::GameMode`]
//! the [`router::Router`] is driving. In `SinglePlay` the client is its own
//! host with zero remote clients, exactly as the Router's routing table
//! describes.

pub mod input;
pub mod net_client;
pub mod rendering;
pub mod router;
pub mod view;
