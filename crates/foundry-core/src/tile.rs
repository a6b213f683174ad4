//! Block types placed on the tile grid.
//!
//! The grid stores raw `u16` codes so the shared frame layout stays plain
//! data; [`TileType`] is the typed view systems work with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// TileType
// ---------------------------------------------------------------------------

/// Every block that can occupy a grid cell. `Empty` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[repr(u16)]
pub enum TileType {
    #[default]
    Empty = 0,
    WallCopper = 1,
    ConveyorUp = 2,
    ConveyorDown = 3,
    ConveyorLeft = 4,
    ConveyorRight = 5,
    CoreShard = 6,
    DrillMechanical = 7,
    SolarPanel = 8,
    Battery = 9,
    PowerNode = 10,
    TurretDuo = 11,
}

impl TileType {
    /// All tile types in code order.
    pub const ALL: [TileType; 12] = [
        TileType::Empty,
        TileType::WallCopper,
        TileType::ConveyorUp,
        TileType::ConveyorDown,
        TileType::ConveyorLeft,
        TileType::ConveyorRight,
        TileType::CoreShard,
        TileType::DrillMechanical,
        TileType::SolarPanel,
        TileType::Battery,
        TileType::PowerNode,
        TileType::TurretDuo,
    ];

    /// Decode a raw grid code. Unknown codes yield `None`.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// The raw code stored in the tile grid.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Stable snake_case name used in data files.
    pub fn name(self) -> &'static str {
        match self {
            TileType::Empty => "empty",
            TileType::WallCopper => "wall_copper",
            TileType::ConveyorUp => "conveyor_up",
            TileType::ConveyorDown => "conveyor_down",
            TileType::ConveyorLeft => "conveyor_left",
            TileType::ConveyorRight => "conveyor_right",
            TileType::CoreShard => "core_shard",
            TileType::DrillMechanical => "drill_mechanical",
            TileType::SolarPanel => "solar_panel",
            TileType::Battery => "battery",
            TileType::PowerNode => "power_node",
            TileType::TurretDuo => "turret_duo",
        }
    }

    /// Direction of travel if this tile is a conveyor.
    pub fn conveyor_direction(self) -> Option<Direction> {
        match self {
            TileType::ConveyorUp => Some(Direction::Up),
            TileType::ConveyorDown => Some(Direction::Down),
            TileType::ConveyorLeft => Some(Direction::Left),
            TileType::ConveyorRight => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn is_conveyor(self) -> bool {
        self.conveyor_direction().is_some()
    }

    /// Whether an item moving onto this tile is accepted (conveyors carry it
    /// onward, the core consumes it).
    pub fn accepts_items(self) -> bool {
        self.is_conveyor() || self == TileType::CoreShard
    }

    /// Whether this tile takes part in power graphs.
    pub fn is_power(self) -> bool {
        matches!(
            self,
            TileType::SolarPanel
                | TileType::Battery
                | TileType::PowerNode
                | TileType::DrillMechanical
                | TileType::TurretDuo
        )
    }
}

impl From<TileType> for u16 {
    fn from(t: TileType) -> u16 {
        t.code()
    }
}

impl TryFrom<u16> for TileType {
    type Error = UnknownTile;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        TileType::from_code(code).ok_or(UnknownTile::Code(code))
    }
}

impl FromStr for TileType {
    type Err = UnknownTile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TileType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTile::Name(s.to_string()))
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tile code or name that does not name any [`TileType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownTile {
    #[error("unknown tile code {0}")]
    Code(u16),
    #[error("unknown tile name '{0}'")]
    Name(String),
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Conveyor travel direction. `Up` is towards smaller `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit step for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_from_code() {
        for t in TileType::ALL {
            assert_eq!(TileType::from_code(t.code()), Some(t));
        }
        assert_eq!(TileType::from_code(12), None);
    }

    #[test]
    fn names_parse_back() {
        for t in TileType::ALL {
            assert_eq!(t.name().parse::<TileType>().unwrap(), t);
        }
        assert!("conveyor_diagonal".parse::<TileType>().is_err());
    }

    #[test]
    fn serde_uses_numeric_code() {
        let json = serde_json::to_string(&TileType::ConveyorRight).unwrap();
        assert_eq!(json, "5");
        let t: TileType = serde_json::from_str("6").unwrap();
        assert_eq!(t, TileType::CoreShard);
        assert!(serde_json::from_str::<TileType>("99").is_err());
    }

    #[test]
    fn power_tiles() {
        let power: Vec<_> = TileType::ALL.into_iter().filter(|t| t.is_power()).collect();
        assert_eq!(
            power,
            vec![
                TileType::DrillMechanical,
                TileType::SolarPanel,
                TileType::Battery,
                TileType::PowerNode,
                TileType::TurretDuo,
            ]
        );
    }

    #[test]
    fn core_accepts_items_but_wall_does_not() {
        assert!(TileType::CoreShard.accepts_items());
        assert!(TileType::ConveyorLeft.accepts_items());
        assert!(!TileType::WallCopper.accepts_items());
        assert!(!TileType::Empty.accepts_items());
    }

    #[test]
    fn conveyor_offsets() {
        assert_eq!(TileType::ConveyorUp.conveyor_direction().unwrap().offset(), (0, -1));
        assert_eq!(TileType::ConveyorRight.conveyor_direction().unwrap().offset(), (1, 0));
        assert!(TileType::DrillMechanical.conveyor_direction().is_none());
    }
}
