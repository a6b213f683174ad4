//! Input command queue for externally submitted world mutations.
//!
//! Commands arrive from the outside (a UI, a script, a network relay) and
//! are applied at the start of the next tick, in arrival order. A command
//! pushed while a tick is running waits for the following one.
//!
//! On the wire a command is a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "BUILD", "x": 5, "y": 5, "block": 7}
//! {"type": "SPAWN_ITEM", "x": 6, "y": 5}
//! {"type": "SPAWN_ENEMY", "x": 20, "y": 3}
//! {"type": "SAVE"}
//! {"type": "LOAD", "data": {"tiles": [], "entities": []}}
//! ```

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;
use crate::serialize::SaveData;
use crate::tile::TileType;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single command that can be submitted to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Place `block` at tile `(x, y)`. `Empty` demolishes.
    Build { x: i32, y: i32, block: TileType },
    /// Spawn a copper item at the centre of tile `(x, y)`.
    SpawnItem { x: i32, y: i32 },
    /// Spawn an enemy unit at the centre of tile `(x, y)`.
    SpawnEnemy { x: i32, y: i32 },
    /// Export the world as it stands when the command is applied.
    Save,
    /// Replace the world with a previously exported one.
    Load { data: SaveData },
}

impl Command {
    /// Decode one wire message.
    pub fn decode(json: &str) -> Result<Self, CommandDecodeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as a wire message.
    pub fn encode(&self) -> Result<String, CommandDecodeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the command type.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "BUILD",
            Command::SpawnItem { .. } => "SPAWN_ITEM",
            Command::SpawnEnemy { .. } => "SPAWN_ENEMY",
            Command::Save => "SAVE",
            Command::Load { .. } => "LOAD",
        }
    }
}

/// A wire message that is not a valid command.
#[derive(Debug, thiserror::Error)]
pub enum CommandDecodeError {
    #[error("malformed command: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick boundary, plus an optional bounded
/// log of what was applied.
#[derive(Debug)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Applied commands: (tick, command).
    history: Vec<(Ticks, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    /// An empty queue with no history tracking.
    pub fn new() -> Self {
        Self::with_max_history(0)
    }

    /// An empty queue that retains up to `max_history` applied commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            max_history,
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Decode a wire message and queue it. Malformed messages are logged
    /// and dropped; the error is returned for the caller's benefit only.
    pub fn push_json(&mut self, json: &str) -> Result<(), CommandDecodeError> {
        match Command::decode(json) {
            Ok(command) => {
                self.push(command);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "dropping malformed command");
                Err(err)
            }
        }
    }

    /// Take every pending command, in submission order, recording them in
    /// the history under `tick`.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Command> {
        let commands = std::mem::take(&mut self.pending);

        if self.max_history > 0 {
            self.history
                .extend(commands.iter().map(|cmd| (tick, cmd.clone())));
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applied (tick, command) pairs, oldest first.
    pub fn history(&self) -> &[(Ticks, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
