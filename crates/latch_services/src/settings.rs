//! Settings management

use latch_core::memory::{HostBufferConfig, HostBufferError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid host buffer settings: {0}")]
    Invalid(#[source] HostBufferError),
}

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host_buffer: HostBufferConfig,
    pub simulation: SimulationSettings,
}

/// Drives the runtime's synthetic frame loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub frames: u32,
    /// Frames at the start of the run that push the heavy workload.
    pub burst_frames: u32,
    pub burst_vertices: u32,
    pub idle_vertices: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            frames: 12,
            burst_frames: 2,
            burst_vertices: 120_000,
            idle_vertices: 4_000,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.host_buffer.validate().map_err(SettingsError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latch_core::memory::{DEFAULT_BLOCK_SIZE, FRAMES_IN_FLIGHT};

    #[test]
    fn empty_json_yields_defaults() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.host_buffer.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(settings.host_buffer.frames_in_flight, FRAMES_IN_FLIGHT);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings = Settings::from_json_str(
            r#"{ "host_buffer": { "frames_in_flight": 2 }, "simulation": { "frames": 30 } }"#,
        )
        .unwrap();
        assert_eq!(settings.host_buffer.frames_in_flight, 2);
        assert_eq!(settings.host_buffer.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(settings.simulation.frames, 30);
        assert_eq!(settings.simulation.burst_frames, 2);
    }

    #[test]
    fn invalid_host_buffer_settings_are_rejected() {
        let err = Settings::from_json_str(r#"{ "host_buffer": { "block_size": 0 } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(HostBufferError::ZeroBlockSize)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Settings::from_json_str("{ host_buffer").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn settings_round_trip_through_a_file() {
        let mut settings = Settings::default();
        settings.host_buffer.block_size = 64 * 1024;

        let path = std::env::temp_dir().join(format!("latch_settings_{}.json", std::process::id()));
        std::fs::write(&path, settings.to_json_string().unwrap()).unwrap();
        let loaded = Settings::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.unwrap(), settings);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Settings::load("/definitely/not/here/settings.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
