//! Configuration file handling for gridspool.
//!
//! Loads queue settings from an INI file with sensible defaults. A missing
//! file is not an error; every key is optional and overlays the defaults.
//!
//! ```ini
//! [queue]
//! capacity = 100
//! timeout = 120
//! ```

use crate::queue::{QueueConfig, DEFAULT_CAPACITY, DEFAULT_TIMEOUT_SECS};
use ini::Ini;
use std::path::Path;
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// User-facing queue settings, as loaded from the config file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpoolSettings {
    /// Maximum number of in-flight write tasks.
    pub capacity: u32,

    /// Admission timeout in whole seconds.
    pub timeout_secs: u64,
}

impl Default for SpoolSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SpoolSettings {
    /// Loads settings from an INI file, overlaying defaults.
    ///
    /// A nonexistent path yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        Self::parse_ini(&ini)
    }

    /// Parses an `Ini` object, overlaying any values found on the defaults.
    fn parse_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let mut settings = Self::default();

        if let Some(section) = ini.section(Some("queue")) {
            if let Some(v) = section.get("capacity") {
                settings.capacity = v.parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "queue".to_string(),
                    key: "capacity".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer".to_string(),
                })?;
                if settings.capacity == 0 {
                    return Err(ConfigFileError::InvalidValue {
                        section: "queue".to_string(),
                        key: "capacity".to_string(),
                        value: v.to_string(),
                        reason: "must be at least 1".to_string(),
                    });
                }
            }
            if let Some(v) = section.get("timeout") {
                settings.timeout_secs = v.parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "queue".to_string(),
                    key: "timeout".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer (seconds)".to_string(),
                })?;
            }
        }

        Ok(settings)
    }
}

impl From<&SpoolSettings> for QueueConfig {
    fn from(settings: &SpoolSettings) -> Self {
        Self {
            capacity: settings.capacity,
            timeout_secs: settings.timeout_secs,
        }
    }
}
