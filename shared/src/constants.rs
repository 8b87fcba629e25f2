//! Contractual constants shared by every component.
//!
//! These values participate in the handshake fingerprint (see
//! [`crate::protocol::build_hash`]); changing any of them changes what a
//! client and host consider to be compatible builds.

/// Application identifier folded into the build hash.
pub const APP_NAME: &str = "razzgravitas";

/// Number of player slots, including the reserved system slot `0`.
///
/// Typed `usize` rather than `u16` because it is primarily used to size and
/// index `PlayerManager`'s slot table; wire fields still carry player ids as
/// `u16` and narrow from this where needed.
pub const MAX_PLAYERS: usize = 13;

/// Number of object slots available to each player.
pub const MAX_OBJECTS_PER_PLAYER: usize = 32;

/// Arena width.
pub const WORLD_WIDTH: f32 = 80.0;
/// Arena height.
pub const WORLD_HEIGHT: f32 = 60.0;

/// Fixed physics integration step, in seconds.
pub const STEP: f32 = 1.0 / 60.0;

/// Gravitational constant used by the `1/r²` force law (see `physics::gravity_force`).
pub const GRAVITY: f32 = 1800.0;

/// Smallest radius a GameObject may have.
pub const MIN_SIZE: f32 = 0.4;
/// Largest radius a freshly created (non-merged) GameObject may have.
pub const MAX_CREATION_SIZE: f32 = 2.0;
/// Largest radius any GameObject, including merge results, may have.
pub const MAX_SIZE: f32 = 6.0;

/// Lifetime of the largest possible object.
pub const MIN_DURATION_SECS: f32 = 10.0;
/// Lifetime of the smallest possible object.
pub const MAX_DURATION_SECS: f32 = 30.0;

/// Score value of the smallest possible object.
pub const MIN_VALUE: u32 = 10;
/// Score value of the largest possible (non-merged) object.
pub const MAX_VALUE: u32 = 100;

/// Below this combined squared speed on both sides, a contact does not merge.
pub const MERGE_VELOCITY_THRESHOLD: f32 = 50.0;
/// Minimum radius ratio for the larger body to swallow the smaller one outright.
pub const SCALE_THRESHOLD: f32 = 1.2;
/// Flat value bonus awarded to a freshly merged object.
pub const MERGE_BONUS: u32 = 5;
/// Flat value bonus awarded to a player when one of their objects expires.
pub const EXPIRATION_BONUS: u32 = 5;

/// Default UDP port for hosting.
pub const PORT: u16 = 12345;

/// Largest UDP payload any single event may occupy.
pub const MAX_PACKET_SIZE: usize = 512;

/// Largest number of object states packed into one `GameObjectSync`.
pub const MAX_PER_SYNC: usize = 16;

/// Host replication tick rate, in milliseconds.
pub const SYNC_RATE_MS: u64 = 50;
/// Client keepalive rate, in milliseconds.
pub const PING_RATE_MS: u64 = 250;
/// Session staleness threshold, in milliseconds.
pub const CONNECTION_TIMEOUT_MS: u64 = 3000;
/// Host highscore broadcast rate, in milliseconds.
pub const HIGHSCORE_SYNC_RATE_MS: u64 = 500;

/// System slot: holds objects orphaned by cross-owner merges and admin placements.
pub const SYSTEM_PLAYER_ID: u16 = 0;
