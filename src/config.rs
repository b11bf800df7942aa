//! Configuration file support.
//!
//! Looked up at `--config <path>` or `<config dir>/sqlapply/config.toml`.
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [scripts]
//! extension = "sql"
//!
//! [output]
//! color = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::locator::DEFAULT_EXTENSION;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub scripts: ScriptsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info` or `sqlapply=debug`.
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptsConfig {
    pub extension: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sqlapply").join("config.toml"))
    }

    /// Load from an explicit path (must exist), or from the default
    /// location if a file is there, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log.level, None);
        assert_eq!(config.scripts.extension, "sql");
        assert!(config.output.color);
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse("[log]\nlevel = \"debug\"\n", Path::new("c.toml")).unwrap();
        assert_eq!(config.log.level.as_deref(), Some("debug"));
        assert_eq!(config.scripts, ScriptsConfig::default());
        assert!(config.output.color);
    }

    #[test]
    fn test_full_file() {
        let config = Config::parse(
            "[log]\nlevel = \"info\"\n[scripts]\nextension = \"mysql\"\n[output]\ncolor = false\n",
            Path::new("c.toml"),
        )
        .unwrap();
        assert_eq!(config.scripts.extension, "mysql");
        assert!(!config.output.color);
    }

    #[test]
    fn test_invalid_file() {
        let err = Config::parse("[log\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_explicit_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sqlapply.toml");
        std::fs::write(&path, "[output]\ncolor = false\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.output.color);
    }
}
