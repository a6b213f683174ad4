//! Structure-of-arrays views over one frame of the shared region.
//!
//! A frame is a single 4-byte-aligned word buffer laid out as described in
//! [`crate::layout`]. [`FrameMut`] and [`FrameView`] reinterpret its
//! sub-ranges as typed slices; they own nothing and never reallocate.
//!
//! Entity slots follow one rule: a slot is live when `ids[slot] != 0`, and a
//! live slot always has `ids[slot] == slot`. Slot 0 is therefore never live.

use std::ops::Range;

use crate::entity::{EntityKind, EntityRecord};
use crate::layout::FrameLayout;
use crate::tile::TileType;

/// Split a frame's words into its six sub-regions.
fn split_regions<'a>(layout: &FrameLayout, words: &'a mut [u32]) -> [&'a mut [u32]; 6] {
    let (ids, rest) = words.split_at_mut(layout.kinds_offset / 4);
    let (kinds, rest) = rest.split_at_mut((layout.positions_offset - layout.kinds_offset) / 4);
    let (positions, rest) =
        rest.split_at_mut((layout.rotations_offset - layout.positions_offset) / 4);
    let (rotations, rest) = rest.split_at_mut((layout.tiles_offset - layout.rotations_offset) / 4);
    let (tiles, map_state) = rest.split_at_mut((layout.map_state_offset - layout.tiles_offset) / 4);
    [ids, kinds, positions, rotations, tiles, map_state]
}

fn region<'a>(layout: &FrameLayout, words: &'a [u32], start: usize, end: usize) -> &'a [u32] {
    debug_assert!(end <= layout.frame_size);
    &words[start / 4..end / 4]
}

// ---------------------------------------------------------------------------
// FrameMut
// ---------------------------------------------------------------------------

/// Mutable SoA view of the frame the simulation currently owns.
#[derive(Debug)]
pub struct FrameMut<'a> {
    layout: FrameLayout,
    pub ids: &'a mut [u16],
    pub kinds: &'a mut [u8],
    /// Interleaved `x, y` per slot.
    pub positions: &'a mut [f32],
    pub rotations: &'a mut [u8],
    pub tiles: &'a mut [u16],
    pub map_state: &'a mut [u8],
}

impl<'a> FrameMut<'a> {
    /// Build a view over a frame's word buffer.
    ///
    /// `words` must be exactly `layout.frame_words()` long.
    pub fn from_words(layout: FrameLayout, words: &'a mut [u32]) -> Self {
        assert_eq!(words.len(), layout.frame_words(), "frame buffer size mismatch");
        let cap = layout.capacity;
        let cells = layout.cells();
        let [ids, kinds, positions, rotations, tiles, map_state] = split_regions(&layout, words);
        Self {
            layout,
            ids: &mut bytemuck::cast_slice_mut::<u32, u16>(ids)[..cap],
            kinds: &mut bytemuck::cast_slice_mut::<u32, u8>(kinds)[..cap],
            positions: &mut bytemuck::cast_slice_mut::<u32, f32>(positions)[..cap * 2],
            rotations: &mut bytemuck::cast_slice_mut::<u32, u8>(rotations)[..cap],
            tiles: &mut bytemuck::cast_slice_mut::<u32, u16>(tiles)[..cells],
            map_state: &mut bytemuck::cast_slice_mut::<u32, u8>(map_state)[..cells],
        }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Read-only reborrow.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            layout: self.layout,
            tick: 0,
            ids: &*self.ids,
            kinds: &*self.kinds,
            positions: &*self.positions,
            rotations: &*self.rotations,
            tiles: &*self.tiles,
            map_state: &*self.map_state,
        }
    }

    // -- Tiles --

    /// Tile at a row-major index. Unknown codes read as `Empty`.
    #[inline]
    pub fn tile(&self, index: usize) -> TileType {
        TileType::from_code(self.tiles[index]).unwrap_or_default()
    }

    /// Tile at grid coordinates, or `None` when outside the map.
    #[inline]
    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileType> {
        self.layout.tile_index(x, y).map(|i| self.tile(i))
    }

    #[inline]
    pub fn set_tile(&mut self, index: usize, tile: TileType) {
        self.tiles[index] = tile.code();
    }

    // -- Entities --

    #[inline]
    pub fn is_live(&self, slot: usize) -> bool {
        self.ids[slot] != 0
    }

    /// Kind of a live slot. Free slots and unknown codes yield `None`.
    #[inline]
    pub fn kind(&self, slot: usize) -> Option<EntityKind> {
        if !self.is_live(slot) {
            return None;
        }
        EntityKind::from_code(self.kinds[slot])
    }

    #[inline]
    pub fn position(&self, slot: usize) -> (f32, f32) {
        (self.positions[slot * 2], self.positions[slot * 2 + 1])
    }

    #[inline]
    pub fn set_position(&mut self, slot: usize, x: f32, y: f32) {
        self.positions[slot * 2] = x;
        self.positions[slot * 2 + 1] = y;
    }

    /// Occupy the first free slot in `range` with a new entity.
    ///
    /// Returns the slot, or `None` when the range is full. Slot 0 is skipped
    /// because an id of 0 means "free".
    pub fn spawn(&mut self, range: Range<usize>, kind: EntityKind, x: f32, y: f32) -> Option<usize> {
        let start = range.start.max(1);
        let end = range.end.min(self.layout.capacity);
        let slot = (start..end).find(|&s| self.ids[s] == 0)?;
        self.place(slot, kind.code(), x, y);
        Some(slot)
    }

    /// Write an entity into an explicit slot, keeping `id == slot`.
    pub fn place(&mut self, slot: usize, kind: u8, x: f32, y: f32) {
        debug_assert!(slot != 0 && slot < self.layout.capacity);
        self.ids[slot] = slot as u16;
        self.kinds[slot] = kind;
        self.set_position(slot, x, y);
        self.rotations[slot] = 0;
    }

    /// Free a slot.
    #[inline]
    pub fn despawn(&mut self, slot: usize) {
        self.ids[slot] = 0;
        self.kinds[slot] = 0;
    }

    /// Reset every region to zero (empty tiles, no entities, zero state).
    pub fn clear(&mut self) {
        self.ids.fill(0);
        self.kinds.fill(0);
        self.positions.fill(0.0);
        self.rotations.fill(0);
        self.tiles.fill(TileType::Empty.code());
        self.map_state.fill(0);
    }
}

// ---------------------------------------------------------------------------
// FrameView
// ---------------------------------------------------------------------------

/// Read-only SoA view of a frame, as seen by the renderer or by tests.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    layout: FrameLayout,
    tick: u64,
    pub ids: &'a [u16],
    pub kinds: &'a [u8],
    pub positions: &'a [f32],
    pub rotations: &'a [u8],
    pub tiles: &'a [u16],
    pub map_state: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Build a view over a frame's word buffer, stamped with the tick it
    /// was published at.
    pub fn from_words(layout: FrameLayout, words: &'a [u32], tick: u64) -> Self {
        assert_eq!(words.len(), layout.frame_words(), "frame buffer size mismatch");
        let cap = layout.capacity;
        let cells = layout.cells();
        let l = &layout;
        Self {
            layout,
            tick,
            ids: &bytemuck::cast_slice::<u32, u16>(region(l, words, l.ids_offset, l.kinds_offset))
                [..cap],
            kinds: &bytemuck::cast_slice::<u32, u8>(region(
                l,
                words,
                l.kinds_offset,
                l.positions_offset,
            ))[..cap],
            positions: &bytemuck::cast_slice::<u32, f32>(region(
                l,
                words,
                l.positions_offset,
                l.rotations_offset,
            ))[..cap * 2],
            rotations: &bytemuck::cast_slice::<u32, u8>(region(
                l,
                words,
                l.rotations_offset,
                l.tiles_offset,
            ))[..cap],
            tiles: &bytemuck::cast_slice::<u32, u16>(region(
                l,
                words,
                l.tiles_offset,
                l.map_state_offset,
            ))[..cells],
            map_state: &bytemuck::cast_slice::<u32, u8>(region(
                l,
                words,
                l.map_state_offset,
                l.frame_size,
            ))[..cells],
        }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// The tick at which this frame was published (0 before the first).
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn tile(&self, index: usize) -> TileType {
        TileType::from_code(self.tiles[index]).unwrap_or_default()
    }

    #[inline]
    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileType> {
        self.layout.tile_index(x, y).map(|i| self.tile(i))
    }

    /// Power efficiency byte (0-100) last written for `(x, y)`.
    pub fn map_state_at(&self, x: i32, y: i32) -> Option<u8> {
        self.layout.tile_index(x, y).map(|i| self.map_state[i])
    }

    #[inline]
    pub fn is_live(&self, slot: usize) -> bool {
        self.ids[slot] != 0
    }

    #[inline]
    pub fn kind(&self, slot: usize) -> Option<EntityKind> {
        if !self.is_live(slot) {
            return None;
        }
        EntityKind::from_code(self.kinds[slot])
    }

    #[inline]
    pub fn position(&self, slot: usize) -> (f32, f32) {
        (self.positions[slot * 2], self.positions[slot * 2 + 1])
    }

    /// All live entities in slot order.
    pub fn records(&self) -> impl Iterator<Item = EntityRecord> + '_ {
        (0..self.layout.capacity)
            .filter(|&s| self.is_live(s))
            .map(|s| {
                let (x, y) = self.position(s);
                EntityRecord {
                    id: self.ids[s],
                    kind: self.kinds[s],
                    x,
                    y,
                }
            })
    }

    /// Slots of live entities of one kind, in slot order.
    pub fn slots_of(&self, kind: EntityKind) -> impl Iterator<Item = usize> + '_ {
        (0..self.layout.capacity).filter(move |&s| self.kind(s) == Some(kind))
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.slots_of(kind).count()
    }

    pub fn live_count(&self) -> usize {
        self.ids.iter().filter(|&&id| id != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FrameLayout {
        FrameLayout::new(8, 8, 33)
    }

    #[test]
    fn views_cover_the_documented_byte_offsets() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        {
            let mut f = FrameMut::from_words(l, &mut words);
            f.ids[1] = 1;
            f.tiles[0] = TileType::CoreShard.code();
            f.map_state[l.cells() - 1] = 77;
        }
        let bytes: &[u8] = bytemuck::cast_slice(&words);
        assert_eq!(u16::from_ne_bytes([bytes[2], bytes[3]]), 1);
        let t = l.tiles_offset;
        assert_eq!(u16::from_ne_bytes([bytes[t], bytes[t + 1]]), 6);
        assert_eq!(bytes[l.map_state_offset + l.cells() - 1], 77);
    }

    #[test]
    fn spawn_uses_first_free_slot_in_range() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut f = FrameMut::from_words(l, &mut words);
        assert_eq!(f.spawn(5..10, EntityKind::ItemCopper, 1.5, 2.5), Some(5));
        assert_eq!(f.spawn(5..10, EntityKind::ItemCopper, 1.5, 2.5), Some(6));
        f.despawn(5);
        assert_eq!(f.spawn(5..10, EntityKind::ItemCopper, 0.0, 0.0), Some(5));
        assert_eq!(f.ids[6], 6);
        assert_eq!(f.kind(6), Some(EntityKind::ItemCopper));
    }

    #[test]
    fn spawn_never_uses_slot_zero() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut f = FrameMut::from_words(l, &mut words);
        assert_eq!(f.spawn(0..3, EntityKind::UnitFlare, 0.0, 0.0), Some(1));
        assert_eq!(f.ids[0], 0);
    }

    #[test]
    fn spawn_fails_when_range_is_full() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut f = FrameMut::from_words(l, &mut words);
        assert!(f.spawn(30..33, EntityKind::ProjectileStandard, 0.0, 0.0).is_some());
        assert!(f.spawn(30..33, EntityKind::ProjectileStandard, 0.0, 0.0).is_some());
        assert!(f.spawn(30..33, EntityKind::ProjectileStandard, 0.0, 0.0).is_some());
        assert_eq!(f.spawn(30..33, EntityKind::ProjectileStandard, 0.0, 0.0), None);
        // Ranges past capacity are truncated, not a panic.
        assert_eq!(f.spawn(30..100, EntityKind::ProjectileStandard, 0.0, 0.0), None);
    }

    #[test]
    fn view_reads_what_mut_wrote() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        {
            let mut f = FrameMut::from_words(l, &mut words);
            f.spawn(1..33, EntityKind::UnitFlare, 3.25, 4.75);
            f.set_tile(l.tile_index(2, 3).unwrap(), TileType::TurretDuo);
        }
        let v = FrameView::from_words(l, &words, 9);
        assert_eq!(v.tick(), 9);
        assert_eq!(v.tile_at(2, 3), Some(TileType::TurretDuo));
        assert_eq!(v.tile_at(9, 9), None);
        let recs: Vec<_> = v.records().collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0], EntityRecord { id: 1, kind: 3, x: 3.25, y: 4.75 });
        assert_eq!(v.count_of(EntityKind::UnitFlare), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let l = layout();
        let mut words = vec![0u32; l.frame_words()];
        let mut f = FrameMut::from_words(l, &mut words);
        f.spawn(1..33, EntityKind::ItemCopper, 1.0, 1.0);
        f.set_tile(0, TileType::WallCopper);
        f.map_state[0] = 50;
        f.clear();
        assert_eq!(f.view().live_count(), 0);
        assert_eq!(f.tile(0), TileType::Empty);
        assert_eq!(f.map_state[0], 0);
    }
}
