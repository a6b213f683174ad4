//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::command_queue::Command;
use crate::config::{EngineConfig, WorldConfig};
use crate::engine::Engine;
use crate::entity::EntityKind;
use crate::fixed::Fixed64;
use crate::frame::FrameView;
use crate::tile::TileType;

// ===========================================================================
// Configs and engines
// ===========================================================================

/// A 16x16 world with 64 slots: units `[1,16)`, items `[16,48)`,
/// projectiles `[48,64)`. Checkpoint logging is off.
pub fn small_config() -> EngineConfig {
    EngineConfig {
        world: WorldConfig {
            width: 16,
            height: 16,
            max_entities: 64,
            unit_slot_start: 1,
            item_slot_start: 16,
            projectile_slot_start: 48,
        },
        hash_log_interval: 0,
        ..EngineConfig::default()
    }
}

pub fn small_engine() -> Engine {
    Engine::new(small_config()).expect("small config is valid")
}

/// Full-size default world.
pub fn default_engine() -> Engine {
    Engine::new(EngineConfig::default()).expect("default config is valid")
}

// ===========================================================================
// Command constructors
// ===========================================================================

pub fn build(x: i32, y: i32, block: TileType) -> Command {
    Command::Build { x, y, block }
}

pub fn demolish(x: i32, y: i32) -> Command {
    build(x, y, TileType::Empty)
}

pub fn spawn_enemy(x: i32, y: i32) -> Command {
    Command::SpawnEnemy { x, y }
}

pub fn spawn_item(x: i32, y: i32) -> Command {
    Command::SpawnItem { x, y }
}

// ===========================================================================
// Frame inspection
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Slots of live entities of `kind`.
pub fn slots(frame: &FrameView<'_>, kind: EntityKind) -> Vec<usize> {
    frame.slots_of(kind).collect()
}

/// Euclidean distance between two live slots.
pub fn distance(frame: &FrameView<'_>, a: usize, b: usize) -> f32 {
    let (ax, ay) = frame.position(a);
    let (bx, by) = frame.position(b);
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

/// Step until `done` holds or `limit` ticks pass. Returns the number of
/// ticks run when `done` first held.
pub fn step_until(engine: &mut Engine, limit: u64, mut done: impl FnMut(&Engine) -> bool) -> Option<u64> {
    for n in 1..=limit {
        engine.step();
        if done(engine) {
            return Some(n);
        }
    }
    None
}
