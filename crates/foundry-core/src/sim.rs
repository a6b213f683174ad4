//! Simulation state and per-step results.

use crate::fixed::Ticks;
use crate::serialize::SaveData;

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable simulation state tracked by the engine.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Ticks completed so far. Incremented once per step, before publish.
    pub tick: Ticks,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Step result
// ---------------------------------------------------------------------------

/// What one `Engine::step()` did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepResult {
    /// The tick number this step published.
    pub tick: Ticks,
    /// Commands that changed the world.
    pub commands_applied: usize,
    /// Commands ignored as out of bounds or for lack of a free slot.
    pub commands_ignored: usize,
    pub items_emitted: usize,
    pub items_consumed: u32,
    pub shots_fired: usize,
    pub kills: usize,
    /// Whether the power graphs were rebuilt this tick.
    pub power_rebuilt: bool,
    /// Exports produced by `SAVE` commands, in command order.
    pub saves: Vec<SaveData>,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// FNV-1a (64-bit) over frame bytes and counters. Two engines fed the same
/// commands produce the same value every tick; not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
