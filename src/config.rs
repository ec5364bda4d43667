//! Haul configuration.
//!
//! Loaded from `~/.haul/config.toml`. Every key is optional and a missing
//! file means defaults:
//!
//! ```toml
//! data-dir = "/var/lib/haul"
//! log = "haul=debug"
//! busy-timeout-ms = 5000
//! ```
//!
//! The data directory is resolved through a chain:
//!
//! 1. `--data-dir <dir>`: explicit per-command override
//! 2. `HAUL_DATA_DIR` env var: process/session level
//! 3. `data-dir` in the config file
//! 4. `~/.haul/`

use std::{env, fs, io, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::storage::{DEFAULT_BUSY_TIMEOUT, Storage};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "HAUL_DATA_DIR";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Haul configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Where `haul.sqlite` lives.
    pub data_dir: Option<PathBuf>,

    /// `tracing` filter directive used when `HAUL_LOG` is unset.
    pub log: Option<String>,

    /// How long a write waits on a database another process has locked.
    pub busy_timeout_ms: Option<u64>,
}

impl Config {
    /// Load config from `~/.haul/config.toml`, or defaults if it doesn't exist.
    ///
    /// Without a home directory there is no config file, so defaults apply
    /// and `--data-dir` or `HAUL_DATA_DIR` can still name the data directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(Self::path())
    }

    fn load_at(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path, or defaults if it doesn't exist.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    /// The config file path: `~/.haul/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Storage::default_root().map(|root| root.join("config.toml"))
    }

    /// Resolve the data directory from the chain described in the module docs.
    pub fn data_dir(&self, explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        let from_env = env::var_os(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.resolve_data_dir(explicit, from_env)
    }

    fn resolve_data_dir(
        &self,
        explicit: Option<PathBuf>,
        from_env: Option<PathBuf>,
    ) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = explicit.or(from_env).or_else(|| self.data_dir.clone()) {
            return Ok(dir);
        }
        Storage::default_root().ok_or(ConfigError::NoHome)
    }

    /// The database busy timeout, falling back to the storage default.
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout_ms
            .map_or(DEFAULT_BUSY_TIMEOUT, Duration::from_millis)
    }
}
