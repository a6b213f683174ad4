//! Reading data files. The format follows the file extension, and a data
//! directory holds at most one file per base name (`config.ron` or
//! `config.toml`, never both).

use std::path::{Path, PathBuf};

use foundry_core::config::{ConfigError, EngineConfig};
use ron::extensions::Extensions;
use serde::de::DeserializeOwned;

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("{file}: expected a .ron, .toml or .json extension")]
    UnsupportedFormat { file: PathBuf },

    /// More than one format of the same file sits in one directory.
    #[error("{stem} is ambiguous in {dir}: found {found:?}")]
    Ambiguous {
        dir: PathBuf,
        stem: String,
        found: Vec<PathBuf>,
    },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A scenario names a block that is not a tile type.
    #[error("unknown block '{name}' in {file}")]
    UnknownBlock { file: PathBuf, name: String },

    /// The configuration parsed but describes an impossible world.
    #[error("invalid configuration in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("failed to read {file}: {source}")]
    Read {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ===========================================================================
// Formats
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Lookup order when scanning a directory.
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    /// The format named by `path`'s extension.
    pub fn of(path: &Path) -> Result<Self, DataLoadError> {
        let ext = path.extension().and_then(|e| e.to_str());
        Self::ALL
            .into_iter()
            .find(|f| Some(f.extension()) == ext)
            .ok_or_else(|| DataLoadError::UnsupportedFormat {
                file: path.to_path_buf(),
            })
    }

    /// Deserialize `text`. RON accepts bare values for optional fields
    /// (`ticks: 300` as well as `ticks: Some(300)`).
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, String> {
        match self {
            Format::Ron => ron::Options::default()
                .with_default_extension(Extensions::IMPLICIT_SOME)
                .from_str(text)
                .map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Find `{stem}.ron`, `{stem}.toml` or `{stem}.json` in `dir`.
pub fn locate(dir: &Path, stem: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Vec<PathBuf> = Format::ALL
        .iter()
        .map(|f| dir.join(format!("{stem}.{}", f.extension())))
        .filter(|p| p.is_file())
        .collect();
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => Err(DataLoadError::Ambiguous {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            found,
        }),
    }
}

/// Read and deserialize one data file.
pub fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = Format::of(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| DataLoadError::Read {
        file: path.to_path_buf(),
        source,
    })?;
    format.parse(&text).map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

// ===========================================================================
// Engine configuration
// ===========================================================================

/// Load and validate an [`EngineConfig`]. Missing sections and fields take
/// their defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, DataLoadError> {
    let config: EngineConfig = read_file(path)?;
    config.validate().map_err(|source| DataLoadError::Config {
        file: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        file = %path.display(),
        width = config.world.width,
        height = config.world.height,
        capacity = config.world.max_entities,
        "loaded engine config"
    );
    Ok(config)
}
