//! TOML configuration for the controller.

use ls_ir::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::keymap::{DEFAULT_OCTAVE, MAX_OCTAVE};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Everything the controller reads at startup.
///
/// ```toml
/// output_dir = "takes"
/// octave = 4
///
/// [session]
/// tempo = 96
/// metronome = false
/// auto_stop = "at_limit"
///
/// [session.geometry]
/// total_bars = 8
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where saved files go
    pub output_dir: PathBuf,
    /// Keyboard octave at startup
    pub octave: u8,
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), octave: DEFAULT_OCTAVE, session: SessionConfig::default() }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.session.geometry.check().map_err(ConfigError::Invalid)?;
        if self.session.track_capacity == 0 {
            return Err(ConfigError::Invalid("track_capacity must be at least 1"));
        }
        if self.octave > MAX_OCTAVE {
            return Err(ConfigError::Invalid("octave must be within 0..=8"));
        }
        Ok(())
    }
}
