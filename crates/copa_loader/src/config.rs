//! Pipeline configuration.
//!
//! Resolution order: defaults → JSON config file (`--config` or
//! `COPA_CONFIG_PATH`) → `COPA_INPUT_PATH` / `COPA_STORE_ROOT` → CLI flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "COPA_CONFIG_PATH";
pub const INPUT_PATH_ENV: &str = "COPA_INPUT_PATH";
pub const STORE_ROOT_ENV: &str = "COPA_STORE_ROOT";

pub const DEFAULT_INPUT_PATH: &str = "data/copa32_events.json";
pub const DEFAULT_STORE_ROOT: &str = "store";
pub const DEFAULT_DATABASE: &str = "copa2024";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Destination names inside the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub events: String,
    pub teams: String,
    pub players: String,
    pub matches: String,
    pub kpis: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            events: "events".to_string(),
            teams: "teams".to_string(),
            players: "players".to_string(),
            matches: "matches".to_string(),
            kpis: "kpis".to_string(),
        }
    }
}

impl CollectionNames {
    fn all(&self) -> [(&'static str, &str); 5] {
        [
            ("events", self.events.as_str()),
            ("teams", self.teams.as_str()),
            ("players", self.players.as_str()),
            ("matches", self.matches.as_str()),
            ("kpis", self.kpis.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub store_root: PathBuf,
    pub database: String,
    pub collections: CollectionNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
            database: DEFAULT_DATABASE.to_string(),
            collections: CollectionNames::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Defaults, then the config file (explicit path first, else
    /// `COPA_CONFIG_PATH`), then the path environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = env_path(CONFIG_PATH_ENV);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                log::debug!("Loading pipeline config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Some(path) = env_path(INPUT_PATH_ENV) {
            self.input_path = path;
        }
        if let Some(path) = env_path(STORE_ROOT_ENV) {
            self.store_root = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("input_path is empty".to_string()));
        }
        if self.store_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_root is empty".to_string()));
        }
        validate_name("database", &self.database)?;

        let mut seen = BTreeSet::new();
        for (role, name) in self.collections.all() {
            validate_name(role, name)?;
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "collection '{name}' is used for more than one destination"
                )));
            }
        }
        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Names become file and directory names in the store.
pub fn validate_name(role: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{role} name is empty")));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ConfigError::Invalid(format!(
            "{role} name '{name}' must not contain path separators"
        )));
    }
    Ok(())
}
