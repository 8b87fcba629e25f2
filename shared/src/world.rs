//! The authoritative physics and object-lifecycle engine.
//!
//! One `World` instance exists per process. On the host and in single-player
//! it runs in `authoritative` mode: it owns the only copy of the truth,
//! integrates gravity, detects and applies merges, expires objects and
//! charges/credits scores. On a client it runs in replicated mode: physics,
//! merges, expiry and scoring are all disabled, and the object table instead
//! mirrors whatever the host's `GameObjectSync` batches describe.
//!
//! Both modes share the same slot table and bitset bookkeeping, because both
//! need to answer "what's alive right now" for rendering.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::*;
use crate::entities::{GameObject, PlayerManager};
use crate::error::GameError;
use crate::physics;
use crate::protocol::GameObjectState;

/// Spring stiffness pulling system-owned (admin-placed, orphaned-merge)
/// bodies back toward their anchor. Not named numerically in the
/// originating design; chosen to be stiff enough to visibly restrain a
/// slot-0 body without overpowering the gravity well of a nearby large one.
const ANCHOR_STIFFNESS: f32 = 40.0;

/// A live (player_id, object_id) pair used to address a slot without
/// borrowing the object itself.
type ObjectKey = (u16, u16);

pub struct World {
    objects: Vec<Vec<Option<GameObject>>>,
    free: Vec<Vec<bool>>,
    players: Arc<PlayerManager>,
    authoritative: bool,
    step_accum: f32,
    /// Contacts found during this step's solver pass, queued here rather than
    /// acted on immediately since the solver is still iterating over the body
    /// list; drained and applied once the step is done.
    pending_merges: Vec<(ObjectKey, ObjectKey)>,
    /// The sync-id epoch this (client-mode) World has most recently adopted.
    /// `None` until the first `GameObjectSync` batch arrives.
    client_epoch: Option<u32>,
}

impl World {
    /// `authoritative` is `true` for Host and SinglePlay, `false` for Client.
    pub fn new(players: Arc<PlayerManager>, authoritative: bool) -> Self {
        World {
            objects: (0..MAX_PLAYERS).map(|_| (0..MAX_OBJECTS_PER_PLAYER).map(|_| None).collect()).collect(),
            free: vec![vec![true; MAX_OBJECTS_PER_PLAYER]; MAX_PLAYERS],
            players,
            authoritative,
            step_accum: 0.0,
            pending_merges: Vec::new(),
            client_epoch: None,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    pub fn scores(&self) -> [i32; MAX_PLAYERS] {
        self.players.scores()
    }

    /// Removes every object owned by `player_id` without crediting score;
    /// used when a session is dropped (timeout, disconnect) rather than
    /// when a player deliberately clears their own objects.
    pub fn remove_all_for_player(&mut self, player_id: u16) {
        if player_id as usize >= MAX_PLAYERS {
            return;
        }
        for object_id in 0..MAX_OBJECTS_PER_PLAYER as u16 {
            self.vacate((player_id, object_id));
        }
    }

    fn get(&self, key: ObjectKey) -> Option<&GameObject> {
        self.objects.get(key.0 as usize)?.get(key.1 as usize)?.as_ref()
    }

    fn get_mut(&mut self, key: ObjectKey) -> Option<&mut GameObject> {
        self.objects.get_mut(key.0 as usize)?.get_mut(key.1 as usize)?.as_mut()
    }

    fn alloc_slot(&mut self, player_id: u16) -> Option<u16> {
        let row = self.free.get_mut(player_id as usize)?;
        let id = row.iter().position(|&free| free)?;
        row[id] = false;
        Some(id as u16)
    }

    fn vacate(&mut self, key: ObjectKey) -> Option<GameObject> {
        let obj = self.objects.get_mut(key.0 as usize)?.get_mut(key.1 as usize)?.take();
        if obj.is_some() {
            self.free[key.0 as usize][key.1 as usize] = true;
        }
        obj
    }

    fn live_keys(&self) -> Vec<ObjectKey> {
        let mut keys = Vec::new();
        for (p, row) in self.objects.iter().enumerate() {
            for (o, slot) in row.iter().enumerate() {
                if slot.is_some() {
                    keys.push((p as u16, o as u16));
                }
            }
        }
        keys
    }

    fn state_of(&self, key: ObjectKey) -> GameObjectState {
        let obj = self.get(key).expect("state_of called on a live key");
        GameObjectState {
            player_id: obj.player_id,
            object_id: obj.object_id,
            position_x: obj.position_x,
            position_y: obj.position_y,
            radius: obj.radius,
            velocity_x: obj.velocity_x,
            velocity_y: obj.velocity_y,
        }
    }

    /// Creates a freshly-authored GameObject (a local player intent, or a
    /// not-yet-seen object mentioned in a replication batch). `charge_score`
    /// gates whether the owner's score is debited; callers applying
    /// replicated state never charge — the host already did.
    fn create(
        &mut self,
        player_id: u16,
        radius: f32,
        position: (f32, f32),
        velocity: (f32, f32),
        now: Instant,
        charge_score: bool,
        sync_id: u32,
    ) -> Option<ObjectKey> {
        if player_id as usize >= MAX_PLAYERS {
            return None;
        }
        if !(0.0..=WORLD_WIDTH).contains(&position.0) || !(0.0..=WORLD_HEIGHT).contains(&position.1) {
            return None;
        }
        let radius = radius.clamp(MIN_SIZE, MAX_CREATION_SIZE);
        let object_id = self.alloc_slot(player_id)?;

        let value = if charge_score {
            let requested = physics::value_for_radius(radius);
            let available = self.players.score(player_id).max(0) as u32;
            let charged = requested.min(available);
            self.players.subtract_score(player_id, charged);
            charged
        } else {
            physics::value_for_radius(radius)
        };

        let obj = GameObject {
            object_id,
            player_id,
            position_x: position.0,
            position_y: position.1,
            velocity_x: velocity.0,
            velocity_y: velocity.1,
            radius,
            value,
            creation: now,
            expiry: now + physics::duration_for_radius(radius),
            root_x: position.0,
            root_y: position.1,
            last_sync_id: sync_id,
        };
        self.objects[player_id as usize][object_id as usize] = Some(obj);
        Some((player_id, object_id))
    }

    /// `AddGameObject`: a local intent (host/single) or the acceptance of a
    /// client's request forwarded by NetworkServer.
    pub fn add_game_object(
        &mut self,
        player_id: u16,
        radius: f32,
        position: (f32, f32),
        velocity: (f32, f32),
        now: Instant,
    ) -> Option<ObjectKey> {
        self.create(player_id, radius, position, velocity, now, self.authoritative, 0)
    }

    pub fn remove_game_object(&mut self, player_id: u16, object_id: u16) -> Option<GameObject> {
        self.vacate((player_id, object_id))
    }

    /// `RemoveGameObjectsNearMouse`: removes every object whose center lies
    /// within `pick_radius` of `point`, crediting each one's owner with half
    /// its value before deleting it. Preserved as-is from the precursor even
    /// on a client with no authority — the next replication batch simply
    /// undoes a client-side removal that didn't originate on the host.
    pub fn remove_near(&mut self, point: (f32, f32), pick_radius: f32) -> Vec<ObjectKey> {
        let mut removed = Vec::new();
        for key in self.live_keys() {
            let obj = self.get(key).unwrap();
            let dx = obj.position_x - point.0;
            let dy = obj.position_y - point.1;
            if (dx * dx + dy * dy).sqrt() <= pick_radius {
                let owner = obj.player_id;
                let credit = obj.value / 2;
                self.vacate(key);
                self.players.add_score(owner, credit);
                removed.push(key);
            }
        }
        removed
    }

    /// Moves every object owned by `old_id` to `new_id`. A collision with an
    /// already-occupied destination slot is an `InvariantViolation`: fatal on
    /// the host, and this implementation panics rather than returning a
    /// recoverable error to match that contract.
    pub fn switch_player(&mut self, old_id: u16, new_id: u16) -> Result<(), GameError> {
        if old_id as usize >= MAX_PLAYERS || new_id as usize >= MAX_PLAYERS {
            return Err(GameError::UnknownPlayer { player_id: old_id });
        }
        let delay = Duration::from_millis(2 * SYNC_RATE_MS);
        for object_id in 0..MAX_OBJECTS_PER_PLAYER as u16 {
            let Some(mut obj) = self.vacate((old_id, object_id)) else {
                continue;
            };
            assert!(
                self.free[new_id as usize][object_id as usize],
                "SwitchPlayer invariant violation: slot ({new_id}, {object_id}) already occupied"
            );
            obj.player_id = new_id;
            obj.creation += delay;
            self.free[new_id as usize][object_id as usize] = false;
            self.objects[new_id as usize][object_id as usize] = Some(obj);
        }
        Ok(())
    }

    /// Accumulates wall-clock time and runs as many fixed `STEP` integrations
    /// as have become due. No-op in replicated (client) mode: clients have no
    /// physics authority, only the host's batches move their objects.
    pub fn step(&mut self, dt: f32, now: Instant) {
        if !self.authoritative {
            return;
        }
        self.step_accum += dt;
        while self.step_accum >= STEP {
            self.integrate_step(now);
            self.step_accum -= STEP;
        }
    }

    fn integrate_step(&mut self, now: Instant) {
        let keys = self.live_keys();
        let mut forces = vec![(0.0f32, 0.0f32); keys.len()];

        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                let a = self.get(keys[i]).unwrap();
                let b = self.get(keys[j]).unwrap();
                let (fx, fy) = physics::gravity_force(a, b);
                forces[i].0 += fx;
                forces[i].1 += fy;
                forces[j].0 -= fx;
                forces[j].1 -= fy;
            }
        }
        for (i, &key) in keys.iter().enumerate() {
            let obj = self.get(key).unwrap();
            if obj.player_id == SYSTEM_PLAYER_ID {
                let (sx, sy) = physics::anchor_spring_force(obj, ANCHOR_STIFFNESS);
                forces[i].0 += sx;
                forces[i].1 += sy;
            }
        }

        for (i, &key) in keys.iter().enumerate() {
            let (fx, fy) = forces[i];
            let obj = self.get_mut(key).unwrap();
            let mass = physics::mass_of(obj.radius);
            obj.velocity_x += fx / mass * STEP;
            obj.velocity_y += fy / mass * STEP;
            obj.position_x += obj.velocity_x * STEP;
            obj.position_y += obj.velocity_y * STEP;

            const RESTITUTION: f32 = 0.75;
            if obj.position_x < 0.0 {
                obj.position_x = 0.0;
                obj.velocity_x = -obj.velocity_x * RESTITUTION;
            } else if obj.position_x > WORLD_WIDTH {
                obj.position_x = WORLD_WIDTH;
                obj.velocity_x = -obj.velocity_x * RESTITUTION;
            }
            if obj.position_y < 0.0 {
                obj.position_y = 0.0;
                obj.velocity_y = -obj.velocity_y * RESTITUTION;
            } else if obj.position_y > WORLD_HEIGHT {
                obj.position_y = WORLD_HEIGHT;
                obj.velocity_y = -obj.velocity_y * RESTITUTION;
            }
        }

        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                let a = self.get(keys[i]).unwrap();
                let b = self.get(keys[j]).unwrap();
                let dx = a.position_x - b.position_x;
                let dy = a.position_y - b.position_y;
                if (dx * dx + dy * dy).sqrt() <= a.radius + b.radius {
                    // Contacts fire inside the solver step; don't mutate the
                    // body list here. Queue onto World's own list and apply
                    // it once the step has finished.
                    self.pending_merges.push((keys[i], keys[j]));
                }
            }
        }

        let merges = std::mem::take(&mut self.pending_merges);
        for (a, b) in merges {
            self.apply_merge(a, b, now);
        }
        self.expire(now);
    }

    /// Applies a queued contact between `a` and `b`. Returns the merged
    /// object's key, or `None` if the contact didn't qualify (too slow, too
    /// large, already gone, or the destination owner has no free slot).
    pub fn apply_merge(&mut self, a: ObjectKey, b: ObjectKey, now: Instant) -> Option<ObjectKey> {
        if !self.authoritative {
            return None;
        }
        let obj_a = self.get(a)?.clone();
        let obj_b = self.get(b)?.clone();
        let result = physics::merge(&obj_a, &obj_b)?;

        if !self.free[result.owner as usize].iter().any(|&free| free) {
            return None;
        }

        self.vacate(a);
        self.vacate(b);

        if let Some(cost) = result.system_adoption_cost {
            self.players.subtract_score(SYSTEM_PLAYER_ID, cost);
        }

        let object_id = self.alloc_slot(result.owner)?;
        let creation = now + Duration::from_millis(2 * SYNC_RATE_MS);
        let obj = GameObject {
            object_id,
            player_id: result.owner,
            position_x: result.position_x,
            position_y: result.position_y,
            velocity_x: result.velocity_x,
            velocity_y: result.velocity_y,
            radius: result.radius,
            value: result.value,
            creation,
            expiry: creation + physics::duration_for_radius(result.radius),
            root_x: result.position_x,
            root_y: result.position_y,
            last_sync_id: 0,
        };
        self.objects[result.owner as usize][object_id as usize] = Some(obj);
        Some((result.owner, object_id))
    }

    /// Credits and removes every object whose expiry has passed. No-op on a
    /// client: the host alone dictates removal, via replication.
    pub fn expire(&mut self, now: Instant) {
        if !self.authoritative {
            return;
        }
        for key in self.live_keys() {
            let obj = self.get(key).unwrap();
            if obj.expiry <= now {
                let owner = obj.player_id;
                let credit = obj.value + EXPIRATION_BONUS;
                self.vacate(key);
                self.players.add_score(owner, credit);
            }
        }
    }

    /// Render snapshot: every live object, regardless of its creation delay.
    /// Emitted every tick to the Window collaborator, independent of
    /// network activity.
    pub fn render_snapshot(&self) -> Vec<GameObjectState> {
        self.live_keys().into_iter().map(|k| self.state_of(k)).collect()
    }

    /// Splits every object whose `creation <= now` into `MAX_PER_SYNC`-sized
    /// batches for replication. Always returns at least one (possibly empty)
    /// batch, so the client's sync-id epoch advances even with nothing to say.
    pub fn sync_batches(&self, now: Instant) -> Vec<Vec<GameObjectState>> {
        let states: Vec<GameObjectState> = self
            .live_keys()
            .into_iter()
            .filter(|&k| self.get(k).unwrap().creation <= now)
            .map(|k| self.state_of(k))
            .collect();

        if states.is_empty() {
            return vec![Vec::new()];
        }
        states.chunks(MAX_PER_SYNC).map(|c| c.to_vec()).collect()
    }

    /// Applies one replicated `GameObjectSync` batch (client-side only).
    ///
    /// On an epoch transition, first garbage-collects every local object not
    /// stamped with the previous epoch, then adopts the new one. Existing
    /// objects have their transform corrected only when the positional error
    /// exceeds a quarter of the reported velocity's squared magnitude, to
    /// damp jitter from merely-late packets.
    pub fn apply_sync_batch(&mut self, sync_id: u32, states: &[GameObjectState], now: Instant) {
        if self.authoritative {
            return;
        }
        if self.client_epoch != Some(sync_id) {
            if let Some(prev_epoch) = self.client_epoch {
                for key in self.live_keys() {
                    if self.get(key).unwrap().last_sync_id != prev_epoch {
                        self.vacate(key);
                    }
                }
            }
            self.client_epoch = Some(sync_id);
        }

        for state in states {
            let key = (state.player_id, state.object_id);
            if let Some(obj) = self.get_mut(key) {
                let dx = state.position_x - obj.position_x;
                let dy = state.position_y - obj.position_y;
                let error_sq = dx * dx + dy * dy;
                let velocity_sq = state.velocity_x * state.velocity_x + state.velocity_y * state.velocity_y;
                if error_sq > velocity_sq / 4.0 {
                    obj.position_x = state.position_x;
                    obj.position_y = state.position_y;
                }
                obj.velocity_x = state.velocity_x;
                obj.velocity_y = state.velocity_y;
                obj.radius = state.radius;
                obj.last_sync_id = sync_id;
            } else {
                self.create(
                    state.player_id,
                    state.radius,
                    (state.position_x, state.position_y),
                    (state.velocity_x, state.velocity_y),
                    now,
                    false,
                    sync_id,
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn object_count(&self) -> usize {
        self.live_keys().len()
    }
}
