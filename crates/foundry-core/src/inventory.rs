//! Core intake: items that reach a core tile are consumed.

use crate::entity::EntityKind;
use crate::frame::FrameMut;
use crate::tile::TileType;

/// Despawn every copper item standing on a core tile and return how many
/// were consumed. The caller credits the shared resource counter.
pub fn consume_at_core(frame: &mut FrameMut<'_>) -> u32 {
    let mut consumed = 0;
    for slot in 0..frame.layout().capacity {
        if frame.kind(slot) != Some(EntityKind::ItemCopper) {
            continue;
        }
        let (x, y) = frame.position(slot);
        if frame.tile_at(x.floor() as i32, y.floor() as i32) == Some(TileType::CoreShard) {
            frame.despawn(slot);
            consumed += 1;
        }
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FrameLayout;

    #[test]
    fn items_on_core_are_consumed() {
        let l = FrameLayout::new(8, 8, 16);
        let mut words = vec![0u32; l.frame_words()];
        let mut frame = FrameMut::from_words(l, &mut words);
        frame.set_tile(l.tile_index(4, 4).unwrap(), TileType::CoreShard);
        let on_core = frame.spawn(1..16, EntityKind::ItemCopper, 4.2, 4.9).unwrap();
        let beside = frame.spawn(1..16, EntityKind::ItemCopper, 3.9, 4.5).unwrap();
        let enemy = frame.spawn(1..16, EntityKind::UnitFlare, 4.5, 4.5).unwrap();

        assert_eq!(consume_at_core(&mut frame), 1);
        assert!(!frame.is_live(on_core));
        assert!(frame.is_live(beside));
        assert!(frame.is_live(enemy));
        assert_eq!(consume_at_core(&mut frame), 0);
    }

    #[test]
    fn items_off_the_map_are_ignored() {
        let l = FrameLayout::new(8, 8, 16);
        let mut words = vec![0u32; l.frame_words()];
        let mut frame = FrameMut::from_words(l, &mut words);
        frame.spawn(1..16, EntityKind::ItemCopper, -0.5, 2.0);
        assert_eq!(consume_at_core(&mut frame), 0);
    }
}
