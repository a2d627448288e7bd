//! Latch Services Layer
//!
//! Platform-facing configuration for the engine's frame systems.

pub mod settings;

pub use settings::{Settings, SettingsError};

/// Load settings from `path`, or fall back to defaults when none is given.
pub fn init_services(path: Option<&std::path::Path>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => Settings::load(path),
        None => {
            tracing::debug!("no settings file given, using defaults");
            Ok(Settings::default())
        }
    }
}
