//! The simulation engine: owns the shared frames, the command queue and
//! every system, and runs the per-tick pipeline.
//!
//! # Pipeline
//!
//! Each [`Engine::step`] runs, in order:
//! 1. **Commands** -- drain the queue and apply every command to the write
//!    frame (builds, spawns, saves, loads)
//! 2. **Conveyors** -- move items along conveyor tiles
//! 3. **Units** -- walk enemy units towards the core
//! 4. **Production** -- drills emit items
//! 5. **Power** -- rebuild graphs if needed, write efficiency bytes
//! 6. **Turrets** -- reload, target and fire
//! 7. **Projectiles** -- age, move and collide
//! 8. **Inventory** -- consume items on the core, credit the header
//! 9. **Publish** -- bump the tick and hand the frame to the renderer side
//!
//! A command applied in phase 1 is therefore visible to every system in
//! the same tick.

use crate::combat::{ProjectileSystem, TurretSystem};
use crate::command_queue::{Command, CommandDecodeError, CommandQueue};
use crate::config::{ConfigError, EngineConfig};
use crate::conveyor::ConveyorSystem;
use crate::entity::EntityKind;
use crate::fixed::Ticks;
use crate::frame::{FrameMut, FrameView};
use crate::inventory;
use crate::layout::FrameLayout;
use crate::power::PowerSystem;
use crate::production::ProductionSystem;
use crate::serialize::{self, SaveData};
use crate::shared::{FrameReader, Header, SharedMemory, SimWriter};
use crate::sim::{SimState, StateHash, StepResult};
use crate::unit::UnitSystem;

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Per-system state. Everything here is owned by the simulation thread and
/// indexed by tile or entity slot.
#[derive(Debug)]
struct Systems {
    conveyor: ConveyorSystem,
    production: ProductionSystem,
    power: PowerSystem,
    turrets: TurretSystem,
    projectiles: ProjectileSystem,
    units: UnitSystem,
}

impl Systems {
    fn new(config: &EngineConfig) -> Self {
        let cells = config.world.width * config.world.height;
        Self {
            conveyor: ConveyorSystem::new(config.conveyor.clone()),
            production: ProductionSystem::new(config.drill.clone(), cells),
            power: PowerSystem::new(config.power.clone(), cells),
            turrets: TurretSystem::new(config.turret.clone(), cells),
            projectiles: ProjectileSystem::new(&config.turret, config.world.max_entities),
            units: UnitSystem::new(config.unit.clone()),
        }
    }

    /// Apply one command. Returns whether it changed anything.
    fn apply(
        &mut self,
        config: &EngineConfig,
        frame: &mut FrameMut<'_>,
        command: Command,
        result: &mut StepResult,
    ) -> bool {
        let layout = *frame.layout();
        match command {
            Command::Build { x, y, block } => {
                let Some(idx) = layout.tile_index(x, y) else {
                    tracing::debug!(x, y, %block, "build out of bounds ignored");
                    return false;
                };
                frame.set_tile(idx, block);
                self.production.reset_tile(idx);
                self.turrets.reset_tile(idx);
                self.units.invalidate_tile(idx);
                self.power.request_rebuild();
                tracing::debug!(x, y, %block, "built");
                true
            }
            Command::SpawnItem { x, y } => {
                spawn_at(frame, config.item_slots(), EntityKind::ItemCopper, x, y)
            }
            Command::SpawnEnemy { x, y } => {
                spawn_at(frame, config.unit_slots(), EntityKind::UnitFlare, x, y)
            }
            Command::Save => {
                let data = serialize::export(&frame.view());
                tracing::info!(
                    tiles = data.tiles.len(),
                    entities = data.entities.len(),
                    "world saved"
                );
                result.saves.push(data);
                true
            }
            Command::Load { data } => {
                let report = serialize::import(frame, &data);
                self.production.reset();
                self.turrets.reset();
                self.projectiles.reset();
                self.units.reset();
                self.power.reset();
                tracing::info!(
                    tiles = report.tiles,
                    entities = report.entities,
                    dropped_tiles = report.dropped_tiles,
                    dropped_entities = report.dropped_entities,
                    "world loaded"
                );
                true
            }
        }
    }
}

/// Spawn an entity at the centre of tile `(x, y)`.
fn spawn_at(
    frame: &mut FrameMut<'_>,
    slots: std::ops::Range<usize>,
    kind: EntityKind,
    x: i32,
    y: i32,
) -> bool {
    if frame.layout().tile_index(x, y).is_none() {
        tracing::debug!(x, y, ?kind, "spawn out of bounds ignored");
        return false;
    }
    match frame.spawn(slots, kind, x as f32 + 0.5, y as f32 + 0.5) {
        Some(slot) => {
            tracing::debug!(x, y, ?kind, slot, "spawned");
            true
        }
        None => {
            tracing::debug!(x, y, ?kind, "no free slot, spawn ignored");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The simulation engine. Owns the writer side of the shared frames; the
/// reader side is handed out once through [`Engine::take_reader`].
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    /// Simulation state (tick counter).
    pub sim_state: SimState,
    writer: SimWriter,
    reader: Option<FrameReader>,
    commands: CommandQueue,
    systems: Systems,
}

impl Engine {
    /// Validate `config` and allocate the shared frames.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (writer, reader) = SharedMemory::split(config.layout());
        let systems = Systems::new(&config);
        let commands = CommandQueue::with_max_history(config.command_history);
        tracing::info!(
            width = config.world.width,
            height = config.world.height,
            capacity = config.world.max_entities,
            bytes = config.layout().total_size(),
            "engine created"
        );
        Ok(Self {
            config,
            sim_state: SimState::new(),
            writer,
            reader: Some(reader),
            commands,
            systems,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout(&self) -> &FrameLayout {
        self.writer.layout()
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    // -----------------------------------------------------------------------
    // Shared frames
    // -----------------------------------------------------------------------

    /// Hand out the renderer's handle. Returns `None` after the first call.
    pub fn take_reader(&mut self) -> Option<FrameReader> {
        self.reader.take()
    }

    pub fn header(&self) -> &Header {
        self.writer.header()
    }

    /// Copper delivered to the core so far.
    pub fn resources(&self) -> u32 {
        self.writer.header().resources()
    }

    /// The simulation's current frame. Between steps this holds the state
    /// most recently published.
    pub fn frame(&self) -> FrameView<'_> {
        self.writer.frame()
    }

    pub fn frame_bytes(&self) -> &[u8] {
        self.writer.frame_bytes()
    }

    /// Byte image of the whole shared region: header, then the three frames.
    pub fn region_bytes(&self) -> Vec<u8> {
        self.writer.region_bytes()
    }

    /// Sparse export of the current frame, outside the tick pipeline.
    pub fn export(&self) -> SaveData {
        serialize::export(&self.frame())
    }

    // -----------------------------------------------------------------------
    // System state
    // -----------------------------------------------------------------------

    pub fn power(&self) -> &PowerSystem {
        &self.systems.power
    }

    pub fn turrets(&self) -> &TurretSystem {
        &self.systems.turrets
    }

    pub fn projectiles(&self) -> &ProjectileSystem {
        &self.systems.projectiles
    }

    pub fn production(&self) -> &ProductionSystem {
        &self.systems.production
    }

    pub fn units(&self) -> &UnitSystem {
        &self.systems.units
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next tick.
    pub fn push_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn push_commands(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.push_batch(commands);
    }

    /// Decode and queue a wire message. Malformed messages are dropped.
    pub fn push_json(&mut self, json: &str) -> Result<(), CommandDecodeError> {
        self.commands.push_json(json)
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    /// Applied commands retained by the input log, oldest first.
    pub fn command_history(&self) -> &[(Ticks, Command)] {
        self.commands.history()
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Run one tick and publish it.
    pub fn step(&mut self) -> StepResult {
        let mut result = StepResult::default();
        let commands = self.commands.drain(self.sim_state.tick);
        let projectile_slots = self.config.projectile_slots();
        let item_slots = self.config.item_slots();

        {
            let systems = &mut self.systems;
            let mut frame = self.writer.frame_mut();

            for command in commands {
                if systems.apply(&self.config, &mut frame, command, &mut result) {
                    result.commands_applied += 1;
                } else {
                    result.commands_ignored += 1;
                }
            }

            systems.conveyor.update(&mut frame);
            systems.units.update(&mut frame);
            result.items_emitted = systems.production.update(&mut frame, item_slots);
            result.power_rebuilt = systems.power.update(&mut frame);
            result.shots_fired =
                systems
                    .turrets
                    .update(&mut frame, &mut systems.projectiles, projectile_slots);
            result.kills = systems.projectiles.update(&mut frame);
            result.items_consumed = inventory::consume_at_core(&mut frame);
        }

        if result.items_consumed > 0 {
            self.writer.header().add_resources(result.items_consumed);
        }

        self.sim_state.tick += 1;
        self.writer.publish(self.sim_state.tick);
        result.tick = self.sim_state.tick;

        let interval = self.config.hash_log_interval;
        if interval > 0 && self.sim_state.tick % interval == 0 {
            tracing::debug!(
                tick = self.sim_state.tick,
                state_hash = self.state_hash(),
                resources = self.resources(),
                live = self.frame().live_count(),
                "simulation checkpoint"
            );
        }

        result
    }

    /// Run `n` ticks, collecting every save produced along the way.
    pub fn run(&mut self, n: u64) -> Vec<SaveData> {
        let mut saves = Vec::new();
        for _ in 0..n {
            saves.extend(self.step().saves);
        }
        saves
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// FNV-1a over the tick, the resource counter and the current frame.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);
        hasher.write_u32(self.resources());
        hasher.write(self.writer.frame_bytes());
        hasher.finish()
    }
}
