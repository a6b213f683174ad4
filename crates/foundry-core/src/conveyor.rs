//! Conveyor movement for item entities.
//!
//! Each tick every live item standing on a conveyor tile is pushed one step
//! in the conveyor's direction. When the tile ahead cannot accept the item
//! (out of bounds, or neither conveyor nor core) the item is held short of
//! the tile edge at `block_threshold`, which makes items queue up visibly.
//! Items are always eased towards the lane centre on the cross axis.

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::frame::FrameMut;

/// Conveyor tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConveyorTuning {
    /// Tiles travelled per tick.
    pub speed: f32,
    /// Furthest in-tile offset an item may reach when the path is blocked.
    pub block_threshold: f32,
    /// Fraction of the cross-axis distance to the lane centre closed per tick.
    pub snap_strength: f32,
}

impl Default for ConveyorTuning {
    fn default() -> Self {
        Self {
            speed: 0.05,
            block_threshold: 0.9,
            snap_strength: 0.1,
        }
    }
}

/// Moves items along conveyors. Stateless apart from its tuning.
#[derive(Debug, Clone, Default)]
pub struct ConveyorSystem {
    tuning: ConveyorTuning,
}

impl ConveyorSystem {
    pub fn new(tuning: ConveyorTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &ConveyorTuning {
        &self.tuning
    }

    /// Advance every item on a conveyor by one tick. Returns the number of
    /// items that were on a conveyor.
    pub fn update(&self, frame: &mut FrameMut<'_>) -> usize {
        let t = &self.tuning;
        let capacity = frame.layout().capacity;
        let mut carried = 0;

        for slot in 0..capacity {
            if frame.kind(slot) != Some(EntityKind::ItemCopper) {
                continue;
            }
            let (mut x, mut y) = frame.position(slot);
            let tx = x.floor() as i32;
            let ty = y.floor() as i32;
            let Some(dir) = frame.tile_at(tx, ty).and_then(|tile| tile.conveyor_direction()) else {
                continue;
            };
            carried += 1;

            let (dx, dy) = dir.offset();
            let blocked = !frame
                .tile_at(tx + dx, ty + dy)
                .is_some_and(|ahead| ahead.accepts_items());

            let step_x = dx as f32 * t.speed;
            let step_y = dy as f32 * t.speed;
            if blocked {
                x = clamp_step(x, step_x, tx as f32, t.block_threshold);
                y = clamp_step(y, step_y, ty as f32, t.block_threshold);
            } else {
                x += step_x;
                y += step_y;
            }

            // Ease towards the lane centre on the cross axis.
            if dir.is_horizontal() {
                let centre = ty as f32 + 0.5;
                y += (centre - y) * t.snap_strength;
            } else {
                let centre = tx as f32 + 0.5;
                x += (centre - x) * t.snap_strength;
            }

            frame.set_position(slot, x, y);
        }

        carried
    }
}

/// Apply `step` to `pos` without letting the offset inside the tile starting
/// at `origin` cross `threshold` in the direction of travel. Items already
/// past the limit stay where they are.
fn clamp_step(pos: f32, step: f32, origin: f32, threshold: f32) -> f32 {
    if step > 0.0 {
        let limit = origin + threshold;
        if pos >= limit { pos } else { (pos + step).min(limit) }
    } else if step < 0.0 {
        let limit = origin + (1.0 - threshold);
        if pos <= limit { pos } else { (pos + step).max(limit) }
    } else {
        pos
    }
}
