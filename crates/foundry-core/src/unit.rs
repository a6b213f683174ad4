//! Enemy unit movement.
//!
//! Enemy units walk straight towards the centre of the core at a fixed
//! speed and face their heading. The core tile is found by scanning the
//! grid once and cached; the cache is dropped when the cached tile is
//! rebuilt or the world is reloaded.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::frame::FrameMut;
use crate::tile::TileType;

/// Unit tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTuning {
    /// Tiles travelled per tick.
    pub speed: f32,
    /// Units closer than this to the core stop moving.
    pub arrival_epsilon: f32,
}

impl Default for UnitTuning {
    fn default() -> Self {
        Self {
            speed: 0.03,
            arrival_epsilon: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnitSystem {
    tuning: UnitTuning,
    core: Option<usize>,
}

impl UnitSystem {
    pub fn new(tuning: UnitTuning) -> Self {
        Self { tuning, core: None }
    }

    /// Cached core tile index, if one has been found.
    pub fn cached_core(&self) -> Option<usize> {
        self.core
    }

    /// Drop the cache if it points at `tile`.
    pub fn invalidate_tile(&mut self, tile: usize) {
        if self.core == Some(tile) {
            self.core = None;
        }
    }

    pub fn reset(&mut self) {
        self.core = None;
    }

    /// Move every enemy unit one step towards the core. Returns the number
    /// of units that moved.
    pub fn update(&mut self, frame: &mut FrameMut<'_>) -> usize {
        if self.core.is_none() {
            self.core = (0..frame.layout().cells()).find(|&i| frame.tile(i) == TileType::CoreShard);
        }
        let Some(core) = self.core else {
            return 0;
        };
        let (cx, cy) = frame.layout().tile_coords(core);
        let (cx, cy) = (cx as f32 + 0.5, cy as f32 + 0.5);

        let mut moved = 0;
        for slot in 0..frame.layout().capacity {
            if !frame.kind(slot).is_some_and(EntityKind::is_enemy) {
                continue;
            }
            let (x, y) = frame.position(slot);
            let (dx, dy) = (cx - x, cy - y);
            let dist = (dx * dx + dy * dy).sqrt();
            if dist <= self.tuning.arrival_epsilon {
                continue;
            }
            let step = self.tuning.speed / dist;
            frame.set_position(slot, x + dx * step, y + dy * step);
            frame.rotations[slot] = heading_byte(dx, dy);
            moved += 1;
        }
        moved
    }
}

/// Heading angle mapped onto a full turn of `0..=255`.
fn heading_byte(dx: f32, dy: f32) -> u8 {
    let turns = dy.atan2(dx).rem_euclid(TAU) / TAU;
    ((turns * 256.0).round() as u32 % 256) as u8
}
