//! Foundry Core -- the simulation engine for a real-time factory and
//! tower-defence game.
//!
//! The world is a fixed-size tile grid plus a fixed-capacity set of mobile
//! entities (items, enemy units, projectiles), stored as structure-of-arrays
//! inside three pre-allocated frames. The simulation writes one frame while
//! a renderer reads another; a lock-free triple-buffer handshake moves
//! frames between them, so neither side ever waits for the other.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the simulation by one tick:
//!
//! 1. **Commands** -- Apply queued builds, spawns, saves and loads.
//! 2. **Conveyors** -- Carry items along conveyor tiles.
//! 3. **Units** -- Walk enemy units towards the core.
//! 4. **Production** -- Drills emit copper onto adjacent conveyors.
//! 5. **Power** -- Flood-fill power graphs and write efficiency bytes.
//! 6. **Turrets** / **Projectiles** -- Target, fire, collide.
//! 7. **Inventory** -- Consume items arriving at the core.
//! 8. **Publish** -- Hand the finished frame to the reader side.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns every system and runs the pipeline.
//! - [`shared::SharedMemory`] -- The header and three frames, split into a
//!   [`shared::SimWriter`] and a [`shared::FrameReader`].
//! - [`frame::FrameMut`] / [`frame::FrameView`] -- Typed SoA views of one
//!   frame.
//! - [`command_queue::Command`] -- The closed set of external commands.
//! - [`serialize::SaveData`] -- The sparse save document.
//! - [`runner::SimulationLoop`] -- Runs an engine at a fixed rate on its
//!   own thread.

pub mod combat;
pub mod command_queue;
pub mod config;
pub mod conveyor;
pub mod engine;
pub mod entity;
pub mod fixed;
pub mod frame;
pub mod inventory;
pub mod layout;
pub mod power;
pub mod production;
pub mod runner;
pub mod serialize;
pub mod shared;
pub mod sim;
pub mod tile;
pub mod unit;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
