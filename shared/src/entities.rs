//! Players and the GameObjects they own.
//!
//! `PlayerManager` is the only structure shared between the Router, World and
//! network components for player bookkeeping. It is guarded by a single
//! mutex and never calls into another locked structure while held, so it can
//! never participate in a lock-ordering deadlock.

use std::sync::Mutex;
use std::time::Instant;

use crate::constants::{MAX_PLAYERS, SYSTEM_PLAYER_ID};
use crate::error::GameError;

/// A connected (or system) player slot.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u16,
    pub score: i32,
    pub connected: bool,
    pub last_seen: Instant,
}

impl Player {
    fn new(id: u16, now: Instant) -> Self {
        Player {
            id,
            score: 0,
            connected: true,
            last_seen: now,
        }
    }
}

/// A single gravitating, mergeable circular body.
///
/// Owns no rendering or networking state; World holds these and emits
/// [`crate::protocol::GameObjectState`] snapshots from them for replication.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub object_id: u16,
    pub player_id: u16,
    pub position_x: f32,
    pub position_y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub radius: f32,
    pub value: u32,
    pub creation: Instant,
    pub expiry: Instant,
    /// Anchor for the slot-0 spring force; meaningless for other players' objects.
    pub root_x: f32,
    pub root_y: f32,
    pub last_sync_id: u32,
}

/// Slot table and scoreboard for every player, including the reserved
/// system slot `0`.
///
/// All operations are O(`MAX_PLAYERS`): the table is small and scanned
/// linearly rather than indexed by a `HashMap`, matching the fixed-size
/// slot-bitset approach the original implementation uses.
pub struct PlayerManager {
    inner: Mutex<[Option<Player>; MAX_PLAYERS]>,
}

impl PlayerManager {
    pub fn new(now: Instant) -> Self {
        let mut slots: [Option<Player>; MAX_PLAYERS] = Default::default();
        slots[SYSTEM_PLAYER_ID as usize] = Some(Player::new(SYSTEM_PLAYER_ID, now));
        PlayerManager {
            inner: Mutex::new(slots),
        }
    }

    /// Admits a new player into the lowest free non-system slot.
    pub fn add_player(&self, now: Instant) -> Result<u16, GameError> {
        let mut slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        for (id, slot) in slots.iter_mut().enumerate().skip(1) {
            if slot.is_none() {
                *slot = Some(Player::new(id as u16, now));
                return Ok(id as u16);
            }
        }
        Err(GameError::ServerFull)
    }

    pub fn remove_player(&self, id: u16) {
        let mut slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        if let Some(slot) = slots.get_mut(id as usize) {
            *slot = None;
        }
    }

    /// Moves a connected player's identity from `old_id` to `new_id`.
    ///
    /// Fails if `old_id` is not occupied or `new_id` already is; the World
    /// is responsible for relocating the player's GameObjects to match.
    pub fn switch_player(&self, old_id: u16, new_id: u16) -> Result<(), GameError> {
        let mut slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        if slots.get(new_id as usize).map(Option::is_some).unwrap_or(true) {
            return Err(GameError::SlotOccupied { player_id: new_id });
        }
        let mut player = slots
            .get_mut(old_id as usize)
            .and_then(Option::take)
            .ok_or(GameError::UnknownPlayer { player_id: old_id })?;
        player.id = new_id;
        slots[new_id as usize] = Some(player);
        Ok(())
    }

    pub fn touch(&self, id: u16, now: Instant) {
        let mut slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        if let Some(Some(player)) = slots.get_mut(id as usize) {
            player.last_seen = now;
        }
    }

    pub fn is_connected(&self, id: u16) -> bool {
        let slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        slots.get(id as usize).map(Option::is_some).unwrap_or(false)
    }

    pub fn add_score(&self, id: u16, amount: u32) {
        let mut slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        if let Some(Some(player)) = slots.get_mut(id as usize) {
            player.score = player.score.saturating_add(amount as i32);
        }
    }

    /// Debits `amount` from a player's score, clamping at zero; players may
    /// spend more than they have banked without going negative.
    pub fn subtract_score(&self, id: u16, amount: u32) {
        let mut slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        if let Some(Some(player)) = slots.get_mut(id as usize) {
            player.score = (player.score - amount as i32).max(0);
        }
    }

    pub fn score(&self, id: u16) -> i32 {
        let slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .map(|p| p.score)
            .unwrap_or(0)
    }

    /// Snapshot of every slot's score, `0` for unoccupied slots, in the
    /// fixed `[i32; MAX_PLAYERS]` shape that `Highscore` wires across.
    pub fn scores(&self) -> [i32; MAX_PLAYERS] {
        let slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        let mut out = [0i32; MAX_PLAYERS];
        for (id, slot) in slots.iter().enumerate() {
            out[id] = slot.as_ref().map(|p| p.score).unwrap_or(0);
        }
        out
    }

    /// Returns the ids of every connected player whose `last_seen` is older
    /// than `now - timeout`.
    pub fn timed_out(&self, now: Instant, timeout: std::time::Duration) -> Vec<u16> {
        let slots = self.inner.lock().expect("PlayerManager mutex poisoned");
        slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(id, slot)| {
                let player = slot.as_ref()?;
                (now.duration_since(player.last_seen) > timeout).then_some(id as u16)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_slot_is_preoccupied() {
        let pm = PlayerManager::new(Instant::now());
        assert!(pm.is_connected(SYSTEM_PLAYER_ID));
    }

    #[test]
    fn add_player_skips_system_slot() {
        let pm = PlayerManager::new(Instant::now());
        let id = pm.add_player(Instant::now()).unwrap();
        assert_ne!(id, SYSTEM_PLAYER_ID);
    }

    #[test]
    fn add_player_fails_when_full() {
        let pm = PlayerManager::new(Instant::now());
        for _ in 1..MAX_PLAYERS {
            pm.add_player(Instant::now()).unwrap();
        }
        assert!(matches!(
            pm.add_player(Instant::now()),
            Err(GameError::ServerFull)
        ));
    }

    #[test]
    fn switch_player_moves_identity() {
        let pm = PlayerManager::new(Instant::now());
        let id = pm.add_player(Instant::now()).unwrap();
        pm.add_score(id, 40);
        pm.switch_player(id, id + 1).unwrap();
        assert!(!pm.is_connected(id));
        assert_eq!(pm.score(id + 1), 40);
    }

    #[test]
    fn switch_player_rejects_occupied_target() {
        let pm = PlayerManager::new(Instant::now());
        let a = pm.add_player(Instant::now()).unwrap();
        let b = pm.add_player(Instant::now()).unwrap();
        assert!(matches!(
            pm.switch_player(a, b),
            Err(GameError::SlotOccupied { .. })
        ));
    }

    #[test]
    fn subtract_score_clamps_at_zero() {
        let pm = PlayerManager::new(Instant::now());
        let id = pm.add_player(Instant::now()).unwrap();
        pm.add_score(id, 5);
        pm.subtract_score(id, 100);
        assert_eq!(pm.score(id), 0);
    }
}
