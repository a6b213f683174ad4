//! Scenario resolution and directory loading.

use std::path::{Path, PathBuf};

use foundry_core::command_queue::Command;
use foundry_core::config::EngineConfig;
use foundry_core::engine::Engine;
use foundry_core::tile::TileType;

use crate::loader::{DataLoadError, load_config, locate, read_file};
use crate::schema::ScenarioData;

// ===========================================================================
// Scenario
// ===========================================================================

/// A scenario resolved into the commands that set it up.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    /// Builds first, then items, then enemies, each in file order.
    pub commands: Vec<Command>,
    pub ticks: Option<u64>,
}

impl Scenario {
    /// Resolve block names. `file` is only used for error messages.
    pub fn resolve(data: ScenarioData, file: &Path) -> Result<Self, DataLoadError> {
        let mut commands =
            Vec::with_capacity(data.builds.len() + data.items.len() + data.enemies.len());

        for build in data.builds {
            let block: TileType = build.block.parse().map_err(|_| DataLoadError::UnknownBlock {
                file: file.to_path_buf(),
                name: build.block.clone(),
            })?;
            commands.push(Command::Build {
                x: build.x,
                y: build.y,
                block,
            });
        }
        commands.extend(data.items.iter().map(|p| Command::SpawnItem { x: p.x, y: p.y }));
        commands.extend(data.enemies.iter().map(|p| Command::SpawnEnemy { x: p.x, y: p.y }));

        Ok(Self {
            name: data.name,
            commands,
            ticks: data.ticks,
        })
    }

    /// Queue every setup command on `engine`; they apply on its next step.
    pub fn apply(&self, engine: &mut Engine) {
        engine.push_commands(self.commands.iter().cloned());
    }
}

/// Load and resolve a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario, DataLoadError> {
    let data: ScenarioData = read_file(path)?;
    let scenario = Scenario::resolve(data, path)?;
    tracing::debug!(
        file = %path.display(),
        name = %scenario.name,
        commands = scenario.commands.len(),
        "loaded scenario"
    );
    Ok(scenario)
}

// ===========================================================================
// Directory loading
// ===========================================================================

/// Everything a data directory provides.
#[derive(Debug, Clone)]
pub struct GameData {
    pub config: EngineConfig,
    pub scenario: Option<Scenario>,
    /// Files actually read, in load order.
    pub files: Vec<PathBuf>,
}

impl GameData {
    /// Create an engine from the config and queue the scenario on it.
    pub fn into_engine(self) -> Result<Engine, foundry_core::config::ConfigError> {
        let mut engine = Engine::new(self.config)?;
        if let Some(scenario) = &self.scenario {
            scenario.apply(&mut engine);
        }
        Ok(engine)
    }
}

/// Load `config.{ron,toml,json}` and `scenario.{ron,toml,json}` from `dir`.
/// Both are optional: a missing config means the defaults.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let mut files = Vec::new();

    let config = match locate(dir, "config")? {
        Some(path) => {
            let config = load_config(&path)?;
            files.push(path);
            config
        }
        None => EngineConfig::default(),
    };

    let scenario = match locate(dir, "scenario")? {
        Some(path) => {
            let scenario = load_scenario(&path)?;
            files.push(path);
            Some(scenario)
        }
        None => None,
    };

    Ok(GameData {
        config,
        scenario,
        files,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BuildData, PointData};
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "foundry_data_scenario_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn resolve_orders_builds_items_enemies() {
        let data = ScenarioData {
            name: "mixed".into(),
            builds: vec![BuildData {
                x: 1,
                y: 2,
                block: "core_shard".into(),
            }],
            items: vec![PointData { x: 3, y: 4 }],
            enemies: vec![PointData { x: 5, y: 6 }],
            ticks: Some(10),
        };
        let scenario = Scenario::resolve(data, Path::new("mixed.ron")).unwrap();
        assert_eq!(
            scenario.commands,
            vec![
                Command::Build {
                    x: 1,
                    y: 2,
                    block: TileType::CoreShard
                },
                Command::SpawnItem { x: 3, y: 4 },
                Command::SpawnEnemy { x: 5, y: 6 },
            ]
        );
        assert_eq!(scenario.ticks, Some(10));
    }

    #[test]
    fn unknown_block_is_an_error() {
        let data = ScenarioData {
            builds: vec![BuildData {
                x: 0,
                y: 0,
                block: "laser_drill".into(),
            }],
            ..ScenarioData::default()
        };
        let err = Scenario::resolve(data, Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, DataLoadError::UnknownBlock { ref name, .. } if name == "laser_drill"));
        assert_eq!(err.to_string(), "unknown block 'laser_drill' in bad.json");
    }

    #[test]
    fn load_scenario_in_each_format() {
        let dir = make_test_dir("formats");

        let ron_path = dir.join("a.ron");
        fs::write(
            &ron_path,
            r#"(name: "line", builds: [(x: 5, y: 5, block: "drill_mechanical")], enemies: [(x: 9, y: 9)])"#,
        )
        .unwrap();

        let json_path = dir.join("b.json");
        fs::write(
            &json_path,
            r#"{"name": "line", "builds": [{"x": 5, "y": 5, "block": "drill_mechanical"}], "enemies": [{"x": 9, "y": 9}]}"#,
        )
        .unwrap();

        let toml_path = dir.join("c.toml");
        fs::write(
            &toml_path,
            r#"
name = "line"

[[builds]]
x = 5
y = 5
block = "drill_mechanical"

[[enemies]]
x = 9
y = 9
"#,
        )
        .unwrap();

        let a = load_scenario(&ron_path).unwrap();
        let b = load_scenario(&json_path).unwrap();
        let c = load_scenario(&toml_path).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.commands.len(), 2);
        cleanup(&dir);
    }

    #[test]
    fn load_game_data_defaults_without_config() {
        let dir = make_test_dir("defaults");
        fs::write(
            dir.join("scenario.json"),
            r#"{"builds": [{"x": 2, "y": 2, "block": "core_shard"}]}"#,
        )
        .unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.config, EngineConfig::default());
        assert_eq!(data.files, vec![dir.join("scenario.json")]);
        let scenario = data.scenario.as_ref().unwrap();
        assert_eq!(scenario.name, "");
        cleanup(&dir);
    }

    #[test]
    fn into_engine_queues_the_scenario() {
        let dir = make_test_dir("engine");
        fs::write(dir.join("config.toml"), "[world]\nwidth = 8\nheight = 8\nmax_entities = 64\nitem_slot_start = 16\nprojectile_slot_start = 48\n").unwrap();
        fs::write(
            dir.join("scenario.ron"),
            r#"(builds: [(x: 7, y: 7, block: "wall_copper")], items: [(x: 0, y: 0)])"#,
        )
        .unwrap();

        let mut engine = load_game_data(&dir).unwrap().into_engine().unwrap();
        assert_eq!(engine.pending_commands(), 2);
        engine.step();
        assert_eq!(engine.frame().tile_at(7, 7), Some(TileType::WallCopper));
        assert_eq!(engine.frame().live_count(), 1);
        cleanup(&dir);
    }

    #[test]
    fn shipped_data_directories_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../foundry-integration-tests/data");
        for name in ["drill_line", "defence", "power_grid"] {
            let data = load_game_data(&root.join(name)).unwrap_or_else(|e| panic!("{name}: {e}"));
            let scenario = data.scenario.unwrap_or_else(|| panic!("{name} has no scenario"));
            assert!(!scenario.commands.is_empty(), "{name} is empty");
        }
        let drill_line = load_game_data(&root.join("drill_line")).unwrap();
        assert_eq!(drill_line.scenario.unwrap().ticks, Some(300));
    }

    #[test]
    fn empty_directory_gives_defaults() {
        let dir = make_test_dir("empty");
        let data = load_game_data(&dir).unwrap();
        assert!(data.scenario.is_none());
        assert!(data.files.is_empty());
        cleanup(&dir);
    }
}
