//! Engine configuration.
//!
//! Every section defaults independently, so a data file only needs to name
//! the values it changes. [`EngineConfig::validate`] is run by
//! [`Engine::new`](crate::engine::Engine::new) before anything is allocated.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::combat::TurretTuning;
use crate::conveyor::ConveyorTuning;
use crate::layout::FrameLayout;
use crate::power::PowerTuning;
use crate::production::DrillTuning;
use crate::unit::UnitTuning;

/// Entity ids are `u16`, so no more slots than this can be addressed.
pub const MAX_CAPACITY: usize = u16::MAX as usize + 1;

/// Largest accepted power node reach, in tiles.
pub const MAX_NODE_RANGE: u32 = 256;

/// Largest accepted per-building power output or demand.
pub const MAX_POWER_RATE: u32 = 1_000_000;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Map dimensions, entity capacity and the spawn ranges inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
    pub max_entities: usize,
    /// First slot for enemy units. Slot 0 is never used.
    pub unit_slot_start: usize,
    /// First slot for items (units end here).
    pub item_slot_start: usize,
    /// First slot for projectiles (items end here; projectiles run to
    /// `max_entities`).
    pub projectile_slot_start: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            max_entities: 10_000,
            unit_slot_start: 1,
            item_slot_start: 256,
            projectile_slot_start: 8192,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world: WorldConfig,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Commands kept in the input log. 0 disables it.
    pub command_history: usize,
    /// Emit a state-hash debug event every this many ticks. 0 disables it.
    pub hash_log_interval: u64,
    pub conveyor: ConveyorTuning,
    pub drill: DrillTuning,
    pub power: PowerTuning,
    pub turret: TurretTuning,
    pub unit: UnitTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            tick_rate: 60,
            command_history: 0,
            hash_log_interval: 600,
            conveyor: ConveyorTuning::default(),
            drill: DrillTuning::default(),
            power: PowerTuning::default(),
            turret: TurretTuning::default(),
            unit: UnitTuning::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("map must be at least 1x1, got {width}x{height}")]
    EmptyMap { width: usize, height: usize },
    #[error("entity capacity {0} is outside 2..=65536")]
    Capacity(usize),
    #[error(
        "slot ranges must satisfy 1 <= units ({units}) <= items ({items}) <= projectiles ({projectiles}) <= capacity ({capacity})"
    )]
    SlotRanges {
        units: usize,
        items: usize,
        projectiles: usize,
        capacity: usize,
    },
    #[error("tick rate must be non-zero")]
    ZeroTickRate,
    #[error("{name} must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must be within [0, 1], got {value}")]
    NotFraction { name: &'static str, value: f32 },
    #[error("{name} must be non-zero")]
    Zero { name: &'static str },
    #[error("{name} must be at most {max}, got {value}")]
    TooLarge {
        name: &'static str,
        value: u32,
        max: u32,
    },
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn fraction(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::NotFraction { name, value })
    }
}

fn at_most(name: &'static str, value: u32, max: u32) -> Result<(), ConfigError> {
    if value > max {
        Err(ConfigError::TooLarge { name, value, max })
    } else {
        Ok(())
    }
}

fn non_zero(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { name })
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl EngineConfig {
    /// Check every value the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.world;
        if w.width == 0 || w.height == 0 {
            return Err(ConfigError::EmptyMap {
                width: w.width,
                height: w.height,
            });
        }
        if !(2..=MAX_CAPACITY).contains(&w.max_entities) {
            return Err(ConfigError::Capacity(w.max_entities));
        }
        let ordered = 1 <= w.unit_slot_start
            && w.unit_slot_start <= w.item_slot_start
            && w.item_slot_start <= w.projectile_slot_start
            && w.projectile_slot_start <= w.max_entities;
        if !ordered {
            return Err(ConfigError::SlotRanges {
                units: w.unit_slot_start,
                items: w.item_slot_start,
                projectiles: w.projectile_slot_start,
                capacity: w.max_entities,
            });
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }

        positive("conveyor.speed", self.conveyor.speed)?;
        fraction("conveyor.block_threshold", self.conveyor.block_threshold)?;
        fraction("conveyor.snap_strength", self.conveyor.snap_strength)?;
        non_zero("drill.cycle_ticks", self.drill.cycle_ticks)?;
        non_zero("power.node_range", self.power.node_range)?;
        at_most("power.node_range", self.power.node_range, MAX_NODE_RANGE)?;
        at_most("power.solar_output", self.power.solar_output, MAX_POWER_RATE)?;
        at_most("power.drill_demand", self.power.drill_demand, MAX_POWER_RATE)?;
        at_most("power.turret_demand", self.power.turret_demand, MAX_POWER_RATE)?;
        positive("turret.range", self.turret.range)?;
        positive("turret.projectile_speed", self.turret.projectile_speed)?;
        positive("turret.hit_radius", self.turret.hit_radius)?;
        positive("unit.speed", self.unit.speed)?;
        if !(self.unit.arrival_epsilon.is_finite() && self.unit.arrival_epsilon >= 0.0) {
            return Err(ConfigError::NotPositive {
                name: "unit.arrival_epsilon",
                value: self.unit.arrival_epsilon,
            });
        }
        Ok(())
    }

    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self.world.width, self.world.height, self.world.max_entities)
    }

    pub fn unit_slots(&self) -> Range<usize> {
        self.world.unit_slot_start..self.world.item_slot_start
    }

    pub fn item_slots(&self) -> Range<usize> {
        self.world.item_slot_start..self.world.projectile_slot_start
    }

    pub fn projectile_slots(&self) -> Range<usize> {
        self.world.projectile_slot_start..self.world.max_entities
    }
}
