//! Coarse timing checks for the hot paths the fixed-step loop exercises
//! every tick: gravity over every live pair, wire encode/decode, and
//! `PlayerManager`'s single-mutex bookkeeping. These aren't criterion-grade
//! benchmarks (no warmup, no statistical reporting) — they assert a loose
//! wall-clock ceiling so a regression that makes a hot path accidentally
//! quadratic or lock-contended fails the suite instead of only showing up
//! as "the game feels laggy" in a later playtest.

use std::sync::Arc;
use std::time::{Duration, Instant};

use shared::constants::*;
use shared::{PlayerManager, WireEvent, World};

fn timed<F: FnOnce()>(f: F) -> Duration {
    let start = Instant::now();
    f();
    start.elapsed()
}

#[test]
fn benchmark_world_step_with_a_full_arena_of_objects() {
    let players = Arc::new(PlayerManager::new(Instant::now()));
    let mut world = World::new(players.clone(), true);

    let players_to_fill = MAX_PLAYERS - 1;
    for player_id in 1..=players_to_fill as u16 {
        players.add_score(player_id, 1_000_000);
        for i in 0..MAX_OBJECTS_PER_PLAYER {
            let x = 1.0 + (i as f32 * 1.7) % (WORLD_WIDTH - 2.0);
            let y = 1.0 + (player_id as f32 * 3.1) % (WORLD_HEIGHT - 2.0);
            world.add_game_object(player_id, MIN_SIZE, (x, y), (0.0, 0.0), Instant::now());
        }
    }

    let elapsed = timed(|| {
        world.step(STEP, Instant::now());
    });

    // One fixed step over a full arena (roughly (MAX_PLAYERS-1)*MAX_OBJECTS_PER_PLAYER
    // bodies, an all-pairs gravity pass) should stay well under a frame budget
    // even on slow CI hardware.
    assert!(
        elapsed < Duration::from_millis(50),
        "a single fixed step over a full arena took {elapsed:?}, expected well under 50ms"
    );
}

#[test]
fn benchmark_sync_batch_generation_over_a_full_arena() {
    let players = Arc::new(PlayerManager::new(Instant::now()));
    let mut world = World::new(players.clone(), true);
    players.add_score(1, 1_000_000);
    let now = Instant::now();
    for i in 0..MAX_OBJECTS_PER_PLAYER {
        world.add_game_object(1, MIN_SIZE, (1.0 + i as f32 * 0.1, 1.0), (0.0, 0.0), now);
    }

    let elapsed = timed(|| {
        let _ = world.sync_batches(now);
    });
    assert!(elapsed < Duration::from_millis(5), "sync batch generation took {elapsed:?}");
}

#[test]
fn benchmark_wire_event_encode_decode_throughput() {
    let event = WireEvent::GameObjectSync {
        sync_id: 1,
        objects: (0..MAX_PER_SYNC as u16)
            .map(|i| shared::GameObjectState {
                player_id: 1,
                object_id: i,
                position_x: i as f32,
                position_y: i as f32,
                radius: MIN_SIZE,
                velocity_x: 0.0,
                velocity_y: 0.0,
            })
            .collect(),
    };

    let iterations: u32 = 10_000;
    let elapsed = timed(|| {
        for _ in 0..iterations {
            let bytes = event.encode();
            let _ = WireEvent::decode(&bytes).unwrap();
        }
    });
    let per_roundtrip = elapsed / iterations;
    assert!(
        per_roundtrip < Duration::from_micros(50),
        "encode+decode averaged {per_roundtrip:?} per round trip over {iterations} iterations"
    );
}

#[test]
fn benchmark_player_manager_under_many_operations() {
    let players = Arc::new(PlayerManager::new(Instant::now()));
    let now = Instant::now();
    let ids: Vec<u16> = (1..MAX_PLAYERS as u16).collect();
    for &id in &ids {
        players.add_player(now).unwrap_or(id);
    }

    let iterations = 50_000;
    let elapsed = timed(|| {
        for i in 0..iterations {
            let id = ids[i % ids.len()];
            players.add_score(id, 1);
            players.subtract_score(id, 1);
            let _ = players.score(id);
        }
    });
    let per_op = elapsed / iterations as u32;
    assert!(per_op < Duration::from_micros(10), "PlayerManager op averaged {per_op:?} over {iterations} iterations");
}

#[test]
fn benchmark_build_hash_is_cheap_enough_to_call_per_handshake() {
    let iterations = 100_000;
    let elapsed = timed(|| {
        for _ in 0..iterations {
            std::hint::black_box(shared::build_hash());
        }
    });
    assert!(elapsed < Duration::from_millis(100), "build_hash() over {iterations} calls took {elapsed:?}");
}
