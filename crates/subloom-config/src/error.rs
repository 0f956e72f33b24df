//! Error types for settings loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for settings operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for settings operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Settings file could not be read.
    #[error("settings file unreadable")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Settings file was not a valid settings document.
    #[error("settings file invalid")]
    Json {
        /// File being parsed.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Field associated with a validation failure.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(field),
            Self::Io { .. } | Self::Json { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_is_exposed_for_validation_errors() {
        let err = ConfigError::InvalidField {
            field: "api_url",
            value: Some("ftp://x".into()),
            reason: "scheme must be http or https",
        };
        assert_eq!(err.field(), Some("api_url"));
        assert_eq!(err.to_string(), "invalid configuration field");

        let io = ConfigError::Io {
            path: PathBuf::from("/missing"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(io.field(), None);
    }
}
