//! Runs a [`World`] on its own OS thread with a single-consumer inbound
//! queue, so the Router never mutates world state directly (§3.2) — it only
//! ever enqueues events and drains whatever the worker posts back.
//!
//! Plain `std::sync::mpsc` rather than Tokio: World needs no async I/O, only
//! a blocking wait bounded by the same "1ms sleep at the bottom of the
//! worker loop" budget the synchronous component model describes (§5).

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::warn;

use crate::constants::HIGHSCORE_SYNC_RATE_MS;
use crate::entities::PlayerManager;
use crate::event::{RouterEvent, SyncTarget};
use crate::world::World;

pub struct WorldWorker {
    pub inbound: mpsc::Sender<RouterEvent>,
    pub outbound: mpsc::Receiver<RouterEvent>,
    thread: Option<JoinHandle<()>>,
}

impl WorldWorker {
    /// `authoritative` selects Host/SinglePlay semantics (`true`) versus a
    /// Client's replicated-only World (`false`).
    pub fn spawn(players: Arc<PlayerManager>, authoritative: bool) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel();
        let (outbound_tx, outbound_rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("world".into())
            .spawn(move || run(World::new(players, authoritative), inbound_rx, outbound_tx))
            .expect("failed to spawn world thread");

        WorldWorker {
            inbound: inbound_tx,
            outbound: outbound_rx,
            thread: Some(thread),
        }
    }

    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(mut world: World, inbound: mpsc::Receiver<RouterEvent>, outbound: mpsc::Sender<RouterEvent>) {
    let mut last_tick = Instant::now();
    let mut last_highscore = Instant::now();

    loop {
        match inbound.recv_timeout(Duration::from_millis(1)) {
            Ok(event) => apply(&mut world, event, &outbound),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        while let Ok(event) = inbound.try_recv() {
            apply(&mut world, event, &outbound);
        }

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;
        world.step(dt, now);

        let render = world.render_snapshot();
        if outbound
            .send(RouterEvent::GameObjectSync { sync_id: 0, objects: render, target: SyncTarget::Window })
            .is_err()
        {
            break;
        }

        if world.is_authoritative() && now.duration_since(last_highscore) >= Duration::from_millis(HIGHSCORE_SYNC_RATE_MS) {
            last_highscore = now;
            if outbound.send(RouterEvent::Highscore { scores: world.scores() }).is_err() {
                break;
            }
        }
    }
}

fn apply(world: &mut World, event: RouterEvent, outbound: &mpsc::Sender<RouterEvent>) {
    match event {
        RouterEvent::AddGameObject { player_id, radius, position, velocity } => {
            world.add_game_object(player_id, radius, position, velocity, Instant::now());
        }
        RouterEvent::RemoveGameObject { player_id, object_id } => {
            world.remove_game_object(player_id, object_id);
        }
        RouterEvent::RemoveNearMouse { position, pick_radius } => {
            world.remove_near(position, pick_radius);
        }
        RouterEvent::SwitchPlayer { old_player_id, new_player_id } => {
            if let Err(e) = world.switch_player(old_player_id, new_player_id) {
                warn!("SwitchPlayer({old_player_id} -> {new_player_id}) rejected: {e}");
            }
        }
        RouterEvent::RemovePlayerGameObjects { player_id } => {
            world.remove_all_for_player(player_id);
        }
        RouterEvent::SyncRequest { sync_id } => {
            if !world.is_authoritative() {
                return;
            }
            for batch in world.sync_batches(Instant::now()) {
                if outbound
                    .send(RouterEvent::GameObjectSync { sync_id, objects: batch, target: SyncTarget::Network })
                    .is_err()
                {
                    return;
                }
            }
        }
        RouterEvent::GameObjectSync { sync_id, objects, target: SyncTarget::Network } => {
            world.apply_sync_batch(sync_id, &objects, Instant::now());
        }
        other => {
            warn!("World worker received an event it has no use for: {other:?}");
        }
    }
}
