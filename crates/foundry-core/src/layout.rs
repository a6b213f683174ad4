//! Byte layout of the shared memory region.
//!
//! ```text
//! +-----------------+  0
//! | header (64 B)   |  16 x u32: tick, reading, ready, resources, reserved...
//! +-----------------+  HEADER_SIZE
//! | frame 0         |  ids | kinds | positions | rotations | tiles | map state
//! | frame 1         |
//! | frame 2         |
//! +-----------------+  HEADER_SIZE + 3 * frame_size
//! ```
//!
//! Inside a frame every sub-region starts on a 4-byte boundary:
//!
//! | region    | element          | count            |
//! |-----------|------------------|------------------|
//! | ids       | `u16`            | capacity         |
//! | kinds     | `u8`             | capacity         |
//! | positions | `f32` (x, y)     | 2 x capacity     |
//! | rotations | `u8`             | capacity         |
//! | tiles     | `u16`            | width x height   |
//! | map state | `u8`             | width x height   |

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Number of 32-bit words in the header.
pub const HEADER_WORDS: usize = HEADER_SIZE / 4;

/// Header word: monotonic count of published ticks.
pub const HDR_TICK: usize = 0;
/// Header word: frame index the renderer has claimed.
pub const HDR_READING: usize = 1;
/// Header word: frame index most recently published by the simulation.
pub const HDR_READY: usize = 2;
/// Header word: accumulated copper delivered to the core.
pub const HDR_RESOURCES: usize = 3;

/// Number of rotating frames.
pub const FRAME_COUNT: usize = 3;

/// Round `n` up to the next multiple of 4.
#[inline]
pub const fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

/// Offsets of every sub-region within one frame, derived from the map
/// dimensions and the entity capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: usize,
    pub height: usize,
    pub capacity: usize,
    pub ids_offset: usize,
    pub kinds_offset: usize,
    pub positions_offset: usize,
    pub rotations_offset: usize,
    pub tiles_offset: usize,
    pub map_state_offset: usize,
    pub frame_size: usize,
}

impl FrameLayout {
    pub fn new(width: usize, height: usize, capacity: usize) -> Self {
        let cells = width * height;
        let ids_offset = 0;
        let kinds_offset = pad4(ids_offset + capacity * 2);
        let positions_offset = pad4(kinds_offset + capacity);
        let rotations_offset = pad4(positions_offset + capacity * 8);
        let tiles_offset = pad4(rotations_offset + capacity);
        let map_state_offset = pad4(tiles_offset + cells * 2);
        let frame_size = pad4(map_state_offset + cells);
        Self {
            width,
            height,
            capacity,
            ids_offset,
            kinds_offset,
            positions_offset,
            rotations_offset,
            tiles_offset,
            map_state_offset,
            frame_size,
        }
    }

    /// Number of grid cells.
    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    /// Frame size in 32-bit words.
    pub fn frame_words(&self) -> usize {
        self.frame_size / 4
    }

    /// Total bytes of the header plus all frames.
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + FRAME_COUNT * self.frame_size
    }

    /// Byte offset of frame `index` from the start of the region.
    pub fn frame_offset(&self, index: usize) -> usize {
        HEADER_SIZE + index * self.frame_size
    }

    /// Row-major index of `(x, y)`, or `None` when outside the map.
    #[inline]
    pub fn tile_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Grid coordinates of a row-major index.
    #[inline]
    pub fn tile_coords(&self, index: usize) -> (i32, i32) {
        ((index % self.width) as i32, (index / self.width) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad4_rounds_up() {
        assert_eq!(pad4(0), 0);
        assert_eq!(pad4(1), 4);
        assert_eq!(pad4(4), 4);
        assert_eq!(pad4(10001), 10004);
    }

    #[test]
    fn offsets_are_aligned_and_ordered() {
        let l = FrameLayout::new(64, 64, 10_001);
        for off in [
            l.ids_offset,
            l.kinds_offset,
            l.positions_offset,
            l.rotations_offset,
            l.tiles_offset,
            l.map_state_offset,
            l.frame_size,
        ] {
            assert_eq!(off % 4, 0);
        }
        assert!(l.kinds_offset >= l.ids_offset + 2 * l.capacity);
        assert!(l.positions_offset >= l.kinds_offset + l.capacity);
        assert!(l.rotations_offset >= l.positions_offset + 8 * l.capacity);
        assert!(l.tiles_offset >= l.rotations_offset + l.capacity);
        assert!(l.map_state_offset >= l.tiles_offset + 2 * l.cells());
        assert!(l.frame_size >= l.map_state_offset + l.cells());
    }

    #[test]
    fn default_sized_layout_matches_hand_computation() {
        let l = FrameLayout::new(64, 64, 10_000);
        assert_eq!(l.kinds_offset, 20_000);
        assert_eq!(l.positions_offset, 30_000);
        assert_eq!(l.rotations_offset, 110_000);
        assert_eq!(l.tiles_offset, 120_000);
        assert_eq!(l.map_state_offset, 120_000 + 8192);
        assert_eq!(l.frame_size, 120_000 + 8192 + 4096);
        assert_eq!(l.total_size(), HEADER_SIZE + 3 * l.frame_size);
    }

    #[test]
    fn tile_index_bounds() {
        let l = FrameLayout::new(8, 4, 16);
        assert_eq!(l.tile_index(0, 0), Some(0));
        assert_eq!(l.tile_index(7, 3), Some(31));
        assert_eq!(l.tile_index(8, 0), None);
        assert_eq!(l.tile_index(0, 4), None);
        assert_eq!(l.tile_index(-1, 2), None);
        assert_eq!(l.tile_coords(31), (7, 3));
    }
}
