//! Entity kinds and the record shape used when entities leave the frame.

use serde::{Deserialize, Serialize};

/// Closed set of entity kinds. Stored as a raw `u8` in the frame; `0`
/// marks an unassigned slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityKind {
    Unit = 1,
    ItemCopper = 2,
    UnitFlare = 3,
    ProjectileStandard = 4,
}

impl EntityKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(EntityKind::Unit),
            2 => Some(EntityKind::ItemCopper),
            3 => Some(EntityKind::UnitFlare),
            4 => Some(EntityKind::ProjectileStandard),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Enemy units chase the core and are what turrets shoot at.
    pub fn is_enemy(self) -> bool {
        self == EntityKind::UnitFlare
    }
}

/// A live entity copied out of the frame: `(id, kind, x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u16,
    #[serde(rename = "type")]
    pub kind: u8,
    pub x: f32,
    pub y: f32,
}

impl EntityRecord {
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_code(self.kind)
    }
}
