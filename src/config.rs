use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::PaceError;
use crate::pace::{DeviationRule, GroupingMode};

const CONFIG_DIR_NAME: &str = "pacewise";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_TARGET_FRACTION: f64 = 0.6;
pub const DEFAULT_PIT_MARKER: &str = "B";
/// Used for whichever percentage is not given when switching to percentage limits
pub const DEFAULT_PERCENTAGE: f64 = 107.0;

/// Defaults applied to every analysis unless overridden on the command line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub pit_marker: String,
    pub target_fraction: f64,
    pub deviation: DeviationRule,
    pub grouping_mode: GroupingMode,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            pit_marker: DEFAULT_PIT_MARKER.to_string(),
            target_fraction: DEFAULT_TARGET_FRACTION,
            deviation: DeviationRule::default(),
            grouping_mode: GroupingMode::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn default_path() -> Result<PathBuf, PaceError> {
        Ok(dirs::config_dir()
            .ok_or(PaceError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Loads the config from the user's config directory, `None` when it was never saved.
    pub fn from_local_file() -> Result<Option<Self>, PaceError> {
        Self::from_path(&Self::default_path()?)
    }

    pub fn from_path(config_path: &Path) -> Result<Option<Self>, PaceError> {
        if !config_path.exists() {
            debug!("No config file at {:?}", config_path);
            return Ok(None);
        }
        let file =
            fs::File::open(config_path).map_err(|e| PaceError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| PaceError::ConfigSerializeError { source: e })
    }

    /// Saves the config to the user's config directory and returns where it went.
    pub fn save(&self) -> Result<PathBuf, PaceError> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), PaceError> {
        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| PaceError::ConfigIOError { source: e })?;
        }

        let file =
            fs::File::create(config_path).map_err(|e| PaceError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PaceError::ConfigSerializeError { source: e })
    }
}
