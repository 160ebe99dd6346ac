//! Engine Configuration
//!
//! Loaded from `missions.toml`. Every field has a default so a missing file
//! or an empty table is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MissionError, Result};

/// Top-level configuration for the mission engine and its host binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Root of the data directory; templates live under `<data_dir>/missions`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Radius searched when checking recruit-by-class goals.
    #[serde(default = "default_recruit_radius")]
    pub recruit_search_radius: i32,
    /// Distance at which a go-to-location goal counts as reached.
    #[serde(default = "default_report_radius")]
    pub report_radius: i32,
    /// Fixed seed for template selection and deadline rolls.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Where the host binary writes its world snapshot, if anywhere.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_recruit_radius() -> i32 {
    100
}

fn default_report_radius() -> i32 {
    1
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            recruit_search_radius: default_recruit_radius(),
            report_radius: default_report_radius(),
            seed: None,
            snapshot_path: None,
        }
    }
}

impl MissionConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| MissionError::Config(e.to_string()))
    }

    /// Load configuration from a file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| MissionError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Directory holding the mission template TOML files.
    pub fn missions_dir(&self) -> PathBuf {
        self.data_dir.join("missions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MissionConfig::from_toml("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.recruit_search_radius, 100);
        assert_eq!(config.report_radius, 1);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = MissionConfig::from_toml("seed = 7\nrecruit_search_radius = 40\n").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.recruit_search_radius, 40);
        assert_eq!(config.missions_dir(), PathBuf::from("data").join("missions"));
    }

    #[test]
    fn test_malformed_config_is_error() {
        let err = MissionConfig::from_toml("seed = \"not a number\"").unwrap_err();
        assert!(matches!(err, MissionError::Config(_)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = MissionConfig::load(&dir.path().join("missions.toml")).unwrap();
        assert_eq!(config.report_radius, 1);
    }
}
