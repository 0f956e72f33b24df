#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
//! Shared HTTP DTOs for the Subloom backend API.
//!
//! These types describe the job listing, job control and settings endpoints
//! the client consumes. The progress stream payloads live in `subloom-events`.
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use subloom_events::JobId;

/// Default page size requested when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Flat settings document; the backend owns validation of its keys.
pub type SettingsDocument = Map<String, Value>;

/// Lifecycle states reported for a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued,
    /// Actively processing; the only state with a live progress stream.
    Running,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failed,
    /// Stopped by an operator.
    Cancelled,
    /// Suspended and resumable.
    Paused,
}

impl JobStatus {
    /// Every status in display order.
    pub const ALL: [Self; 6] = [
        Self::Queued,
        Self::Running,
        Self::Success,
        Self::Failed,
        Self::Cancelled,
        Self::Paused,
    ];

    /// Wire label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Paused => "paused",
        }
    }

    /// Whether the job reached a final state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

impl Display for JobStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == needle)
            .ok_or_else(|| format!("unknown job status '{value}'"))
    }
}

/// Cached snapshot of a backend job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Backend identifier.
    pub id: JobId,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Completion percentage (0.0–100.0).
    #[serde(default)]
    pub progress: f64,
    /// Current pipeline phase, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Job type label (for example `translation` or `scan`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Display name, usually the subtitle or media file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Whether the job is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }
}

/// Query parameters accepted by the job listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListQuery {
    /// Restrict to a single status.
    pub status: Option<JobStatus>,
    /// Restrict to a single job type.
    pub kind: Option<String>,
    /// One-based page number.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
}

impl Default for JobListQuery {
    fn default() -> Self {
        Self {
            status: None,
            kind: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl JobListQuery {
    /// Render the query as URL pairs in a stable order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(kind) = &self.kind {
            pairs.push(("type", kind.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("page_size", self.page_size.to_string()));
        pairs
    }
}

/// Paginated job listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobListResponse {
    /// Jobs on the requested page.
    pub jobs: Vec<Job>,
    /// Total number of jobs matching the filter.
    #[serde(default)]
    pub total: u64,
    /// Page number echoed by the backend.
    #[serde(default)]
    pub page: u32,
    /// Page size echoed by the backend.
    #[serde(default)]
    pub page_size: u32,
}

/// Imperative job control operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    /// Start a queued or paused job.
    Start,
    /// Cancel a queued or running job.
    Cancel,
    /// Re-run a failed or cancelled job.
    Retry,
    /// Remove the job record.
    Delete,
}

impl JobAction {
    /// Wire label, also used as the URL segment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Cancel => "cancel",
            Self::Retry => "retry",
            Self::Delete => "delete",
        }
    }
}

/// Body for batch job control requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchJobRequest {
    /// Jobs targeted by the action.
    pub ids: Vec<JobId>,
}

/// Per-job failure inside a batch response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchFailure {
    /// Job the action failed for.
    pub id: JobId,
    /// Backend error detail.
    pub error: String,
}

/// Outcome of a batch job control request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchJobResponse {
    /// Jobs the action was applied to.
    #[serde(default)]
    pub succeeded: Vec<JobId>,
    /// Jobs the action was rejected for.
    #[serde(default)]
    pub failed: Vec<BatchFailure>,
}

/// Error document returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ApiErrorBody {
    /// Detailed diagnostic message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Generic message field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Short error label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Most specific message carried by the body.
    #[must_use]
    pub fn best_message(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}
