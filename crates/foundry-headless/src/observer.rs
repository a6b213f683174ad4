//! The renderer stand-in: claims published frames and summarises them.

use foundry_core::entity::EntityKind;
use foundry_core::frame::FrameView;
use foundry_core::shared::FrameReader;

/// What one claimed frame showed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub tick: u64,
    pub resources: u32,
    pub items: usize,
    pub enemies: usize,
    pub projectiles: usize,
    pub buildings: usize,
}

impl FrameStats {
    pub fn from_view(view: &FrameView<'_>, resources: u32) -> Self {
        let mut stats = Self {
            tick: view.tick(),
            resources,
            buildings: view.tiles.iter().filter(|&&t| t != 0).count(),
            ..Self::default()
        };
        for slot in 0..view.layout().capacity {
            match view.kind(slot) {
                Some(EntityKind::ItemCopper) => stats.items += 1,
                Some(kind) if kind.is_enemy() => stats.enemies += 1,
                Some(EntityKind::ProjectileStandard) => stats.projectiles += 1,
                _ => {}
            }
        }
        stats
    }
}

/// Owns the reader handle and counts what it has seen.
#[derive(Debug)]
pub struct Observer {
    reader: FrameReader,
    frames: u64,
    repeats: u64,
    last_tick: u64,
}

impl Observer {
    pub fn new(reader: FrameReader) -> Self {
        Self {
            reader,
            frames: 0,
            repeats: 0,
            last_tick: 0,
        }
    }

    /// Claim the newest frame and summarise it.
    pub fn observe(&mut self) -> FrameStats {
        let resources = self.reader.header().resources();
        let view = self.reader.claim();
        let stats = FrameStats::from_view(&view, resources);

        debug_assert!(stats.tick >= self.last_tick, "published ticks went backwards");
        if stats.tick == self.last_tick {
            self.repeats += 1;
        }
        self.last_tick = stats.tick;
        self.frames += 1;
        stats
    }

    /// Frames claimed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Claims that returned an already seen tick.
    pub fn repeats(&self) -> u64 {
        self.repeats
    }

    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }
}
