//! Configuration for the `dueday` binary.
//!
//! Resolution order (highest first):
//! 1. CLI arguments
//! 2. Environment variables (`DUEDAY_DATA_DIR`, `DUEDAY_LOG`, via clap `env`)
//! 3. TOML config file (`~/.config/dueday/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Top-level TOML config file. All fields optional for partial overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    storage: StorageFileConfig,
    log: LogFileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogFileConfig {
    level: Option<String>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `tasks.json`, `patterns.json` and `completions.json`.
    pub data_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        data_dir.push("dueday");
        Self {
            data_dir,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Loads the config file and merges it with `overrides`.
    ///
    /// An explicit `--config` path must exist; the default path may be absent.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = load_config_file(overrides.config.as_deref())?;
        Ok(Self::resolve(overrides, &file))
    }

    fn resolve(overrides: &Overrides, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: overrides
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            log_level: overrides
                .log_level
                .clone()
                .or_else(|| file.log.level.clone())
                .unwrap_or(defaults.log_level),
        }
    }
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|source| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("dueday").join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        let config = Config::resolve(&Overrides::default(), &file);
        assert_eq!(config, Config::default());
        assert!(config.data_dir.ends_with("dueday"));
    }

    #[test]
    fn file_values_apply() {
        let file: ConfigFile = toml::from_str(
            r#"
[storage]
data_dir = "/srv/dueday"

[log]
level = "debug"
"#,
        )
        .unwrap();
        let config = Config::resolve(&Overrides::default(), &file);
        assert_eq!(config.data_dir, PathBuf::from("/srv/dueday"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn overrides_beat_file() {
        let file: ConfigFile = toml::from_str("[storage]\ndata_dir = \"/srv/dueday\"\n").unwrap();
        let overrides = Overrides {
            data_dir: Some(PathBuf::from("/tmp/elsewhere")),
            ..Default::default()
        };
        let config = Config::resolve(&overrides, &file);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = load_config_file(Some(Path::new("/nonexistent/dueday.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let result: Result<ConfigFile, _> = toml::from_str("[storage]\ndata_dir = 3\n");
        assert!(result.is_err());
    }
}
