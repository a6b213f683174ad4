//! Drill production.
//!
//! Every drill tile counts up a cooldown. When it reaches the cycle length
//! the drill tries to drop one copper item onto an adjacent conveyor or
//! core, checking `+x, -x, +y, -y` in that order. A successful emission
//! restarts the cycle; a failed one holds the counter at the threshold so
//! the drill retries every tick until it can output.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::frame::FrameMut;
use crate::tile::TileType;

/// Neighbour search order for drill output.
const OUTPUT_ORDER: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Drill tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillTuning {
    /// Ticks between emissions.
    pub cycle_ticks: u32,
}

impl Default for DrillTuning {
    fn default() -> Self {
        Self { cycle_ticks: 60 }
    }
}

/// Per-tile drill cooldowns plus the emission logic.
#[derive(Debug, Clone)]
pub struct ProductionSystem {
    tuning: DrillTuning,
    cooldowns: Vec<u32>,
}

impl ProductionSystem {
    pub fn new(tuning: DrillTuning, cells: usize) -> Self {
        Self {
            tuning,
            cooldowns: vec![0; cells],
        }
    }

    pub fn cooldown(&self, tile: usize) -> u32 {
        self.cooldowns.get(tile).copied().unwrap_or(0)
    }

    /// Forget the cooldown of one tile (it was rebuilt).
    pub fn reset_tile(&mut self, tile: usize) {
        if let Some(c) = self.cooldowns.get_mut(tile) {
            *c = 0;
        }
    }

    pub fn reset(&mut self) {
        self.cooldowns.fill(0);
    }

    /// Advance every drill by one tick, spawning items into `item_slots`.
    /// Returns the number of items emitted.
    pub fn update(&mut self, frame: &mut FrameMut<'_>, item_slots: Range<usize>) -> usize {
        let cycle = self.tuning.cycle_ticks;
        let mut emitted = 0;

        for idx in 0..frame.layout().cells() {
            if frame.tile(idx) != TileType::DrillMechanical {
                continue;
            }
            let cooldown = &mut self.cooldowns[idx];
            *cooldown = cooldown.saturating_add(1);
            if *cooldown < cycle {
                continue;
            }

            let (x, y) = frame.layout().tile_coords(idx);
            if try_output(frame, x, y, item_slots.clone()) {
                *cooldown = 0;
                emitted += 1;
            } else {
                *cooldown = cycle;
            }
        }

        emitted
    }
}

/// Spawn one item on the centre of the first accepting neighbour.
fn try_output(frame: &mut FrameMut<'_>, x: i32, y: i32, item_slots: Range<usize>) -> bool {
    for (dx, dy) in OUTPUT_ORDER {
        let (nx, ny) = (x + dx, y + dy);
        let Some(tile) = frame.tile_at(nx, ny) else {
            continue;
        };
        if tile.accepts_items() {
            // Only the first accepting neighbour is tried; a full item range
            // blocks the drill until a slot frees up.
            return frame
                .spawn(item_slots, EntityKind::ItemCopper, nx as f32 + 0.5, ny as f32 + 0.5)
                .is_some();
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FrameLayout;

    const ITEMS: Range<usize> = 4..16;

    fn layout() -> FrameLayout {
        FrameLayout::new(8, 8, 16)
    }

    fn put(frame: &mut FrameMut<'_>, x: i32, y: i32, tile: TileType) {
        let idx = frame.layout().tile_index(x, y).unwrap();
        frame.set_tile(idx, tile);
    }

    #[test]
    fn drill_emits_after_one_cycle() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut frame = FrameMut::from_words(l, &mut words);
        put(&mut frame, 2, 2, TileType::DrillMechanical);
        put(&mut frame, 3, 2, TileType::ConveyorRight);

        let mut sys = ProductionSystem::new(DrillTuning::default(), l.cells());
        for _ in 0..59 {
            assert_eq!(sys.update(&mut frame, ITEMS), 0);
        }
        assert_eq!(sys.update(&mut frame, ITEMS), 1);

        let view = frame.view();
        let slots: Vec<_> = view.slots_of(EntityKind::ItemCopper).collect();
        assert_eq!(slots, vec![4]);
        assert_eq!(view.position(4), (3.5, 2.5));
        assert_eq!(sys.cooldown(l.tile_index(2, 2).unwrap()), 0);
    }

    #[test]
    fn blocked_drill_holds_at_threshold_and_retries() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut frame = FrameMut::from_words(l, &mut words);
        put(&mut frame, 2, 2, TileType::DrillMechanical);
        let idx = l.tile_index(2, 2).unwrap();

        let tuning = DrillTuning { cycle_ticks: 5 };
        let mut sys = ProductionSystem::new(tuning, l.cells());
        for _ in 0..20 {
            sys.update(&mut frame, ITEMS);
        }
        assert_eq!(sys.cooldown(idx), 5);

        // A core appears on the -x side; the very next tick emits.
        put(&mut frame, 1, 2, TileType::CoreShard);
        assert_eq!(sys.update(&mut frame, ITEMS), 1);
        assert_eq!(frame.view().position(4), (1.5, 2.5));
    }

    #[test]
    fn neighbour_order_prefers_positive_x() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut frame = FrameMut::from_words(l, &mut words);
        put(&mut frame, 3, 3, TileType::DrillMechanical);
        put(&mut frame, 2, 3, TileType::ConveyorLeft);
        put(&mut frame, 4, 3, TileType::ConveyorRight);
        put(&mut frame, 3, 4, TileType::ConveyorDown);

        let mut sys = ProductionSystem::new(DrillTuning { cycle_ticks: 1 }, l.cells());
        sys.update(&mut frame, ITEMS);
        assert_eq!(frame.view().position(4), (4.5, 3.5));
    }

    #[test]
    fn full_item_range_blocks_emission() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut frame = FrameMut::from_words(l, &mut words);
        put(&mut frame, 2, 2, TileType::DrillMechanical);
        put(&mut frame, 3, 2, TileType::ConveyorRight);

        let mut sys = ProductionSystem::new(DrillTuning { cycle_ticks: 1 }, l.cells());
        assert_eq!(sys.update(&mut frame, 4..5), 1);
        assert_eq!(sys.update(&mut frame, 4..5), 0);
        assert_eq!(sys.cooldown(l.tile_index(2, 2).unwrap()), 1);
    }

    #[test]
    fn reset_tile_restarts_cycle() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut frame = FrameMut::from_words(l, &mut words);
        put(&mut frame, 2, 2, TileType::DrillMechanical);
        let idx = l.tile_index(2, 2).unwrap();

        let mut sys = ProductionSystem::new(DrillTuning::default(), l.cells());
        for _ in 0..10 {
            sys.update(&mut frame, ITEMS);
        }
        assert_eq!(sys.cooldown(idx), 10);
        sys.reset_tile(idx);
        assert_eq!(sys.cooldown(idx), 0);
    }
}
