//! Settings model and partial overlays.
//!
//! # Design
//! - `ClientSettings` is the effective, fully populated view.
//! - `ClientSettingsOverlay` is one layer (file, environment, flags); unset fields
//!   fall through to the layer below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Effective client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Backend base URL.
    pub api_url: String,
    /// API key sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// REST request timeout, in seconds.
    pub http_timeout_secs: u64,
    /// Job list polling interval, in milliseconds.
    pub poll_interval_ms: u64,
    /// Progress stream path template containing `{job_id}`.
    pub stream_path: String,
    /// Job collection path.
    pub jobs_path: String,
    /// Settings document path.
    pub settings_path: String,
    /// Tracing level directive.
    pub log_level: String,
    /// Log output format (`json` or `pretty`).
    pub log_format: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: defaults::API_URL.to_string(),
            api_key: None,
            http_timeout_secs: defaults::HTTP_TIMEOUT_SECS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            stream_path: defaults::STREAM_PATH.to_string(),
            jobs_path: defaults::JOBS_PATH.to_string(),
            settings_path: defaults::SETTINGS_PATH.to_string(),
            log_level: defaults::LOG_LEVEL.to_string(),
            log_format: defaults::LOG_FORMAT.to_string(),
        }
    }
}

impl ClientSettings {
    /// REST request timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Job list polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Copy safe to print: the API key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}

/// One partial layer of settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSettingsOverlay {
    /// Backend base URL.
    #[serde(default)]
    pub api_url: Option<String>,
    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// REST request timeout, in seconds.
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    /// Polling interval, in milliseconds.
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Progress stream path template.
    #[serde(default)]
    pub stream_path: Option<String>,
    /// Job collection path.
    #[serde(default)]
    pub jobs_path: Option<String>,
    /// Settings document path.
    #[serde(default)]
    pub settings_path: Option<String>,
    /// Tracing level directive.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Log output format.
    #[serde(default)]
    pub log_format: Option<String>,
}

impl ClientSettingsOverlay {
    /// Write every set field over `settings`.
    pub fn apply_to(self, settings: &mut ClientSettings) {
        if let Some(value) = self.api_url {
            settings.api_url = value;
        }
        if let Some(value) = self.api_key {
            settings.api_key = Some(value).filter(|key| !key.trim().is_empty());
        }
        if let Some(value) = self.http_timeout_secs {
            settings.http_timeout_secs = value;
        }
        if let Some(value) = self.poll_interval_ms {
            settings.poll_interval_ms = value;
        }
        if let Some(value) = self.stream_path {
            settings.stream_path = value;
        }
        if let Some(value) = self.jobs_path {
            settings.jobs_path = value;
        }
        if let Some(value) = self.settings_path {
            settings.settings_path = value;
        }
        if let Some(value) = self.log_level {
            settings.log_level = value;
        }
        if let Some(value) = self.log_format {
            settings.log_format = value.to_ascii_lowercase();
        }
    }
}
