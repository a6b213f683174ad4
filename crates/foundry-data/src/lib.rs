//! Data-file loading for Foundry: engine configuration and scenarios in
//! RON, TOML or JSON, resolved into engine types.

pub mod loader;
pub mod scenario;
pub mod schema;

pub use loader::{DataLoadError, Format, load_config, locate, read_file};
pub use scenario::{GameData, Scenario, load_game_data, load_scenario};
