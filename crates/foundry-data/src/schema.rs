//! Serde data file structs for scenarios.
//!
//! A scenario names tiles by their data-file names (`"drill_mechanical"`,
//! `"conveyor_right"`, ...) and is resolved into engine commands by
//! [`crate::scenario`].

use serde::{Deserialize, Serialize};

/// A scenario as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub builds: Vec<BuildData>,
    /// Tiles to drop a copper item on.
    #[serde(default)]
    pub items: Vec<PointData>,
    /// Tiles to spawn an enemy flare on.
    #[serde(default)]
    pub enemies: Vec<PointData>,
    /// Suggested run length in ticks.
    #[serde(default)]
    pub ticks: Option<u64>,
}

/// One tile placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildData {
    pub x: i32,
    pub y: i32,
    pub block: String,
}

/// A tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointData {
    pub x: i32,
    pub y: i32,
}
