//! Built-in client settings.
//!
//! # Design
//! - Keep every default in one place so docs, validation and tests agree.

/// Backend base URL used when nothing else is configured.
pub const API_URL: &str = "http://127.0.0.1:8080";
/// Per-request timeout for REST calls, in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;
/// Job list polling interval, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 2_000;
/// Progress stream path template.
pub const STREAM_PATH: &str = "/api/jobs/{job_id}/stream";
/// Job collection path.
pub const JOBS_PATH: &str = "/api/jobs";
/// Settings document path.
pub const SETTINGS_PATH: &str = "/api/settings";
/// Default tracing level directive.
pub const LOG_LEVEL: &str = "info";
/// Default log output format.
pub const LOG_FORMAT: &str = "pretty";

/// Accepted timeout range, in seconds.
pub const HTTP_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;
/// Accepted polling interval range, in milliseconds.
pub const POLL_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 250..=60_000;
/// Accepted log formats.
pub const LOG_FORMATS: [&str; 2] = ["json", "pretty"];
