//! Fixed-rate simulation loop on a dedicated thread.
//!
//! The loop drains incoming commands, steps the engine and sleeps until the
//! next tick deadline. Deadlines advance by exactly one period per tick, so
//! the rate does not drift; after a long stall the schedule is reset rather
//! than running a burst of catch-up ticks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::command_queue::Command;
use crate::engine::Engine;
use crate::serialize::SaveData;

/// Ticks the loop may fall behind before it gives up catching up.
const MAX_CATCH_UP_TICKS: u32 = 5;

/// A running simulation. Dropping it stops the thread.
#[derive(Debug)]
pub struct SimulationLoop {
    commands: Sender<Command>,
    saves: Receiver<SaveData>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Engine>>,
}

impl SimulationLoop {
    /// Start stepping `engine` at its configured tick rate.
    ///
    /// Take the engine's reader before calling this if a renderer needs it.
    pub fn spawn(engine: Engine) -> std::io::Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (save_tx, save_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("foundry-sim".into())
            .spawn(move || run(engine, command_rx, save_tx, flag))?;

        Ok(Self {
            commands: command_tx,
            saves: save_rx,
            stop,
            handle: Some(handle),
        })
    }

    /// A handle for submitting commands from any thread.
    pub fn sender(&self) -> Sender<Command> {
        self.commands.clone()
    }

    /// Submit a command. Returns `false` once the loop has exited.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn try_recv_save(&self) -> Option<SaveData> {
        self.saves.try_recv().ok()
    }

    /// Wait up to `timeout` for the next save.
    pub fn recv_save_timeout(&self, timeout: Duration) -> Option<SaveData> {
        match self.saves.recv_timeout(timeout) {
            Ok(save) => Some(save),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop after its current tick and return the engine. Returns
    /// `None` if the simulation thread panicked.
    pub fn stop(mut self) -> Option<Engine> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<Engine> {
        self.stop.store(true, Ordering::Release);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(engine) => Some(engine),
            Err(_) => {
                tracing::error!("simulation thread panicked");
                None
            }
        }
    }
}

impl Drop for SimulationLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    mut engine: Engine,
    commands: Receiver<Command>,
    saves: Sender<SaveData>,
    stop: Arc<AtomicBool>,
) -> Engine {
    let period = Duration::from_secs_f64(1.0 / f64::from(engine.config().tick_rate));
    tracing::info!(tick_rate = engine.config().tick_rate, tick = engine.tick(), "simulation loop started");

    let mut deadline = Instant::now();
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
            continue;
        }

        engine.push_commands(commands.try_iter());
        let result = engine.step();
        for save in result.saves {
            // The receiving side may already be gone during shutdown.
            let _ = saves.send(save);
        }

        deadline += period;
        let behind = Instant::now().saturating_duration_since(deadline);
        if behind > period * MAX_CATCH_UP_TICKS {
            tracing::warn!(
                tick = engine.tick(),
                behind_ms = behind.as_millis() as u64,
                "simulation overran its schedule; skipping ahead"
            );
            deadline = Instant::now();
        }
    }

    tracing::info!(tick = engine.tick(), "simulation loop stopped");
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build, small_config};
    use crate::tile::TileType;

    fn fast_engine() -> Engine {
        let mut config = small_config();
        config.tick_rate = 1000;
        Engine::new(config).unwrap()
    }

    #[test]
    fn loop_steps_and_stops() {
        let sim = SimulationLoop::spawn(fast_engine()).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(sim.is_running());
        let engine = sim.stop().unwrap();
        assert!(engine.tick() > 0);
    }

    #[test]
    fn commands_and_saves_cross_the_thread() {
        let sim = SimulationLoop::spawn(fast_engine()).unwrap();
        assert!(sim.send(build(3, 3, TileType::CoreShard)));
        assert!(sim.send(Command::Save));
        let save = sim.recv_save_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(save.tiles.len(), 1);
        assert_eq!(save.tiles[0].tile, TileType::CoreShard.code());

        let engine = sim.stop().unwrap();
        assert_eq!(engine.frame().tile_at(3, 3), Some(TileType::CoreShard));
    }

    #[test]
    fn reader_sees_progress_while_loop_runs() {
        let mut engine = fast_engine();
        let mut reader = engine.take_reader().unwrap();
        let sim = SimulationLoop::spawn(engine).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut last = 0;
        while last < 10 && Instant::now() < deadline {
            let tick = reader.claim().tick();
            assert!(tick >= last);
            last = tick;
            thread::yield_now();
        }
        assert!(last >= 10);
        drop(sim);
    }
}
