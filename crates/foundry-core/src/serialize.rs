//! Save and load.
//!
//! A save is sparse: every non-empty tile as `(idx, type)` and every live
//! entity as `(id, type, x, y)`. The portable form is JSON; a compact
//! `bitcode` form wraps the same data behind a versioned header that pins
//! the map dimensions and entity capacity it was taken with.
//!
//! Import is forgiving about content: entries that do not fit the target
//! world are dropped and logged, the rest is applied.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityKind, EntityRecord};
use crate::fixed::Ticks;
use crate::frame::{FrameMut, FrameView};
use crate::layout::FrameLayout;
use crate::tile::TileType;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a binary save.
pub const SAVE_MAGIC: u32 = 0xF0D7_0001;

/// Current binary format version. Increment when breaking the wire format.
pub const SAVE_FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("json save error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SAVE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported save version: expected {}, got {}", SAVE_FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error(
        "save was taken on a {found_width}x{found_height} map with {found_capacity} slots, \
         this world is {width}x{height} with {capacity}"
    )]
    DimensionMismatch {
        width: usize,
        height: usize,
        capacity: usize,
        found_width: u32,
        found_height: u32,
        found_capacity: u32,
    },
}

// ---------------------------------------------------------------------------
// Save document
// ---------------------------------------------------------------------------

/// One non-empty tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileEntry {
    pub idx: u32,
    /// Raw tile code; unknown codes are dropped on import.
    #[serde(rename = "type")]
    pub tile: u16,
}

/// The sparse save document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    #[serde(default)]
    pub tiles: Vec<TileEntry>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl SaveData {
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as a binary save for a world of the given shape.
    pub fn to_bytes(&self, layout: &FrameLayout, tick: Ticks) -> Result<Vec<u8>, SaveError> {
        let file = SaveFile {
            header: SaveHeader::new(layout, tick),
            data: self.clone(),
        };
        bitcode::serialize(&file).map_err(|e| SaveError::Encode(e.to_string()))
    }

    /// Decode a binary save, rejecting saves from a differently shaped world.
    pub fn from_bytes(bytes: &[u8], layout: &FrameLayout) -> Result<(SaveHeader, Self), SaveError> {
        let file: SaveFile =
            bitcode::deserialize(bytes).map_err(|e| SaveError::Decode(e.to_string()))?;
        file.header.validate(layout)?;
        Ok((file.header, file.data))
    }

    /// Sort tiles by index and entities by id, for order-independent
    /// comparison.
    pub fn normalized(mut self) -> Self {
        self.tiles.sort_by_key(|t| t.idx);
        self.entities.sort_by_key(|e| e.id);
        self
    }
}

/// Header of a binary save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub magic: u32,
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub capacity: u32,
    /// Tick at which the save was taken.
    pub tick: Ticks,
}

impl SaveHeader {
    pub fn new(layout: &FrameLayout, tick: Ticks) -> Self {
        Self {
            magic: SAVE_MAGIC,
            version: SAVE_FORMAT_VERSION,
            width: layout.width as u32,
            height: layout.height as u32,
            capacity: layout.capacity as u32,
            tick,
        }
    }

    pub fn validate(&self, layout: &FrameLayout) -> Result<(), SaveError> {
        if self.magic != SAVE_MAGIC {
            return Err(SaveError::InvalidMagic(self.magic));
        }
        if self.version != SAVE_FORMAT_VERSION {
            return Err(SaveError::UnsupportedVersion(self.version));
        }
        let matches = self.width as usize == layout.width
            && self.height as usize == layout.height
            && self.capacity as usize == layout.capacity;
        if !matches {
            return Err(SaveError::DimensionMismatch {
                width: layout.width,
                height: layout.height,
                capacity: layout.capacity,
                found_width: self.width,
                found_height: self.height,
                found_capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveFile {
    header: SaveHeader,
    data: SaveData,
}

// ---------------------------------------------------------------------------
// Export / import
// ---------------------------------------------------------------------------

/// Sparse copy of a frame.
pub fn export(frame: &FrameView<'_>) -> SaveData {
    let tiles = frame
        .tiles
        .iter()
        .enumerate()
        .filter(|&(_, &code)| code != TileType::Empty.code())
        .map(|(idx, &code)| TileEntry {
            idx: idx as u32,
            tile: code,
        })
        .collect();
    SaveData {
        tiles,
        entities: frame.records().collect(),
    }
}

/// What an import applied and what it dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub tiles: usize,
    pub entities: usize,
    pub dropped_tiles: usize,
    pub dropped_entities: usize,
}

/// Clear the frame and apply `data`. Entities land in the slot named by
/// their id, so `id == slot` holds afterwards.
pub fn import(frame: &mut FrameMut<'_>, data: &SaveData) -> ImportReport {
    let layout = *frame.layout();
    let mut report = ImportReport::default();
    frame.clear();

    for entry in &data.tiles {
        let idx = entry.idx as usize;
        let tile = TileType::from_code(entry.tile);
        match tile {
            Some(tile) if idx < layout.cells() => {
                frame.set_tile(idx, tile);
                report.tiles += 1;
            }
            _ => {
                tracing::warn!(idx = entry.idx, code = entry.tile, "dropping invalid save tile");
                report.dropped_tiles += 1;
            }
        }
    }

    for rec in &data.entities {
        let slot = rec.id as usize;
        let valid = slot != 0
            && slot < layout.capacity
            && EntityKind::from_code(rec.kind).is_some()
            && rec.x.is_finite()
            && rec.y.is_finite();
        if valid {
            frame.place(slot, rec.kind, rec.x, rec.y);
            report.entities += 1;
        } else {
            tracing::warn!(id = rec.id, kind = rec.kind, "dropping invalid save entity");
            report.dropped_entities += 1;
        }
    }

    report
}
