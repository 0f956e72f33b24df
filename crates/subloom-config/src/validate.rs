//! Validation helpers for client settings.

use url::Url;

use crate::defaults::{HTTP_TIMEOUT_RANGE, LOG_FORMATS, POLL_INTERVAL_RANGE};
use crate::error::{ConfigError, ConfigResult};
use crate::model::ClientSettings;

const JOB_ID_PLACEHOLDER: &str = "{job_id}";

/// Check every field of `settings`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails.
pub fn validate_settings(settings: &ClientSettings) -> ConfigResult<()> {
    parse_api_url(&settings.api_url)?;
    if !HTTP_TIMEOUT_RANGE.contains(&settings.http_timeout_secs) {
        return Err(invalid(
            "http_timeout_secs",
            settings.http_timeout_secs.to_string(),
            "must be between 1 and 300 seconds",
        ));
    }
    if !POLL_INTERVAL_RANGE.contains(&settings.poll_interval_ms) {
        return Err(invalid(
            "poll_interval_ms",
            settings.poll_interval_ms.to_string(),
            "must be between 250 and 60000 milliseconds",
        ));
    }
    if !settings.stream_path.contains(JOB_ID_PLACEHOLDER) {
        return Err(invalid(
            "stream_path",
            settings.stream_path.clone(),
            "must contain the {job_id} placeholder",
        ));
    }
    validate_path("stream_path", &settings.stream_path)?;
    validate_path("jobs_path", &settings.jobs_path)?;
    validate_path("settings_path", &settings.settings_path)?;
    if settings.log_level.trim().is_empty() {
        return Err(invalid("log_level", String::new(), "must not be empty"));
    }
    if !LOG_FORMATS.contains(&settings.log_format.as_str()) {
        return Err(invalid(
            "log_format",
            settings.log_format.clone(),
            "must be json or pretty",
        ));
    }
    Ok(())
}

/// Parse and check the backend base URL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the URL does not parse, uses a
/// scheme other than http/https, or has no host.
pub fn parse_api_url(value: &str) -> ConfigResult<Url> {
    let url = Url::parse(value.trim())
        .map_err(|_| invalid("api_url", value.to_string(), "must be an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            "api_url",
            value.to_string(),
            "scheme must be http or https",
        ));
    }
    if url.host_str().is_none() {
        return Err(invalid("api_url", value.to_string(), "must include a host"));
    }
    Ok(url)
}

fn validate_path(field: &'static str, value: &str) -> ConfigResult<()> {
    if value.starts_with('/') {
        Ok(())
    } else {
        Err(invalid(field, value.to_string(), "must start with '/'"))
    }
}

const fn invalid(field: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        field,
        value: Some(value),
        reason,
    }
}
