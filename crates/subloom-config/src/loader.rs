//! Layered settings loading.
//!
//! # Design
//! - Layers apply in order: built-in defaults, optional JSON file, caller overrides
//!   (environment and command-line flags, already merged by the caller).
//! - Validation runs once on the final result.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ClientSettings, ClientSettingsOverlay};
use crate::validate::validate_settings;

/// Read one overlay layer from a JSON settings file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Json`] when it is not a valid partial settings object.
pub fn read_overlay(path: &Path) -> ConfigResult<ClientSettingsOverlay> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Build validated settings from the defaults, an optional file and overrides.
///
/// # Errors
///
/// Propagates file errors from [`read_overlay`] and validation errors from
/// [`validate_settings`].
pub fn load_settings(
    file: Option<&Path>,
    overrides: ClientSettingsOverlay,
) -> ConfigResult<ClientSettings> {
    let mut settings = ClientSettings::default();
    if let Some(path) = file {
        read_overlay(path)?.apply_to(&mut settings);
        debug!(path = %path.display(), "applied settings file");
    }
    overrides.apply_to(&mut settings);
    validate_settings(&settings)?;
    Ok(settings)
}
