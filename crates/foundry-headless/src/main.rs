//! Headless Foundry runner.
//!
//! Runs the simulation on its own thread at the configured tick rate while
//! the main thread plays the renderer: it claims published frames at a
//! display-like rate and logs what it sees. Optionally writes a save on exit.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 64x64 world, empty map, ten seconds
//! cargo run -p foundry-headless
//!
//! # A data directory holding config.{ron,toml,json} and scenario.{ron,toml,json}
//! cargo run -p foundry-headless -- --data crates/foundry-integration-tests/data/drill_line
//!
//! # Explicit files, extra wire commands, and a save written on exit
//! cargo run -p foundry-headless -- --config world.toml --scenario level.ron \
//!     --commands input.jsonl --seconds 30 --save out.json
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.

mod observer;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use foundry_core::command_queue::Command;
use foundry_core::config::{ConfigError, EngineConfig};
use foundry_core::engine::Engine;
use foundry_core::runner::SimulationLoop;
use foundry_core::serialize::{SaveData, SaveError};
use foundry_data::{DataLoadError, Scenario, load_config, load_game_data, load_scenario};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::observer::Observer;

#[derive(Parser, Debug)]
#[command(name = "foundry-headless")]
#[command(about = "Run the Foundry simulation without graphics")]
#[command(version)]
struct Cli {
    /// Directory with config and scenario files
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Engine config file (overrides the data directory's)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario file (overrides the data directory's)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Newline-delimited JSON command messages to send after the scenario
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Wall-clock run time; defaults to the scenario's tick count, or 10s
    #[arg(long)]
    seconds: Option<f64>,

    /// Frames per second the observer claims at
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Write a save here on exit (`.json` for JSON, anything else binary)
    #[arg(long)]
    save: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum HeadlessError {
    #[error(transparent)]
    Data(#[from] DataLoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start the simulation thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("the frame reader was already taken")]
    ReaderTaken,
    #[error("the simulation loop exited unexpectedly")]
    LoopDied,
    #[error("timed out waiting for the save")]
    SaveTimeout,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Resolve config and scenario from the data directory and explicit paths.
fn load_inputs(cli: &Cli) -> Result<(EngineConfig, Option<Scenario>), HeadlessError> {
    let (mut config, mut scenario) = match &cli.data {
        Some(dir) => {
            let data = load_game_data(dir)?;
            (data.config, data.scenario)
        }
        None => (EngineConfig::default(), None),
    };
    if let Some(path) = &cli.config {
        config = load_config(path)?;
    }
    if let Some(path) = &cli.scenario {
        scenario = Some(load_scenario(path)?);
    }
    Ok((config, scenario))
}

/// Decode a JSON-lines command file. Malformed lines are skipped.
fn read_commands(path: &Path) -> Result<Vec<Command>, HeadlessError> {
    let text = std::fs::read_to_string(path).map_err(|source| HeadlessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut commands = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Command::decode(line) {
            Ok(cmd) => commands.push(cmd),
            Err(e) => tracing::warn!(line = line_no + 1, error = %e, "skipping malformed command"),
        }
    }
    Ok(commands)
}

fn write_save(path: &Path, data: &SaveData, engine: &Engine) -> Result<(), HeadlessError> {
    let bytes = if path.extension().is_some_and(|e| e == "json") {
        data.to_json_pretty()?.into_bytes()
    } else {
        data.to_bytes(engine.layout(), engine.tick())?
    };
    std::fs::write(path, &bytes).map_err(|source| HeadlessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        tiles = data.tiles.len(),
        entities = data.entities.len(),
        "save written"
    );
    Ok(())
}

fn run(cli: Cli) -> Result<(), HeadlessError> {
    let (config, scenario) = load_inputs(&cli)?;
    let tick_rate = config.tick_rate;
    let extra = match &cli.commands {
        Some(path) => read_commands(path)?,
        None => Vec::new(),
    };

    let seconds = cli
        .seconds
        .or_else(|| {
            scenario
                .as_ref()
                .and_then(|s| s.ticks)
                .map(|t| t as f64 / f64::from(tick_rate))
        })
        .unwrap_or(10.0);

    let mut engine = Engine::new(config)?;
    if let Some(scenario) = &scenario {
        tracing::info!(name = %scenario.name, commands = scenario.commands.len(), "scenario queued");
        scenario.apply(&mut engine);
    }
    engine.push_commands(extra);

    let reader = engine.take_reader().ok_or(HeadlessError::ReaderTaken)?;
    let mut observer = Observer::new(reader);
    let sim = SimulationLoop::spawn(engine).map_err(HeadlessError::Spawn)?;

    let frame_period = Duration::from_secs_f64(1.0 / f64::from(cli.fps.max(1)));
    let run_for = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX);
    let started = Instant::now();
    let mut next_report = started;

    while started.elapsed() < run_for {
        if !sim.is_running() {
            return Err(HeadlessError::LoopDied);
        }
        let stats = observer.observe();
        if Instant::now() >= next_report {
            tracing::info!(
                tick = stats.tick,
                resources = stats.resources,
                buildings = stats.buildings,
                items = stats.items,
                enemies = stats.enemies,
                projectiles = stats.projectiles,
                "frame"
            );
            next_report += Duration::from_secs(1);
        }
        thread::sleep(frame_period);
    }

    let saved = match &cli.save {
        Some(_) => {
            if !sim.send(Command::Save) {
                return Err(HeadlessError::LoopDied);
            }
            Some(
                sim.recv_save_timeout(Duration::from_secs(5))
                    .ok_or(HeadlessError::SaveTimeout)?,
            )
        }
        None => None,
    };

    let engine = sim.stop().ok_or(HeadlessError::LoopDied)?;
    tracing::info!(
        ticks = engine.tick(),
        resources = engine.resources(),
        frames = observer.frames(),
        repeats = observer.repeats(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );

    if let (Some(path), Some(data)) = (&cli.save, &saved) {
        write_save(path, data, &engine)?;
    }
    Ok(())
}
