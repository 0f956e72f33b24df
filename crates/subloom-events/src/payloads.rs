//! Progress stream payload types carried between the backend and the client.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Zero-based position of a subtitle line within a job.
pub type LineIndex = u32;

/// Message reported when an `error` frame carries no text of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "translation failed";

/// Opaque identifier assigned to a job by the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a backend identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Translation state of a single line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Queued for translation.
    Pending,
    /// Currently being translated.
    Translating,
    /// Translation finished.
    #[default]
    Completed,
}

impl LineStatus {
    /// Wire label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Translating => "translating",
            Self::Completed => "completed",
        }
    }
}

/// One subtitle line as pushed by the progress stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationLine {
    /// Position of the line within the job.
    pub index: LineIndex,
    /// Original subtitle text.
    #[serde(default)]
    pub source: String,
    /// Translated text; empty while the line is still in flight.
    #[serde(default)]
    pub translated: String,
    /// Translation state; frames without a status describe finished lines.
    #[serde(default)]
    pub status: LineStatus,
}

/// Typed events decoded from a job's progress stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Scalar progress update.
    Progress {
        /// Completion percentage as reported by the backend.
        progress: f64,
    },
    /// A translated (or in-flight) line.
    Line(TranslationLine),
    /// The job finished successfully. Terminal.
    Complete,
    /// The job failed. Terminal.
    Error {
        /// Failure detail supplied by the backend.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl ProgressEvent {
    /// Machine-friendly discriminator matching the wire `type` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Line(_) => "line",
            Self::Complete => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Whether the event ends the job's stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error { .. })
    }
}

/// Message delivered by a progress stream connection, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// The transport confirmed the connection.
    Opened,
    /// A successfully decoded frame.
    Event(ProgressEvent),
    /// The transport failed or the server closed the stream. Terminal.
    TransportError {
        /// Human-readable failure reason.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn line_frame_defaults_missing_fields() -> Result<(), serde_json::Error> {
        let event: ProgressEvent = serde_json::from_value(json!({"type": "line", "index": 4}))?;
        assert_eq!(
            event,
            ProgressEvent::Line(TranslationLine {
                index: 4,
                source: String::new(),
                translated: String::new(),
                status: LineStatus::Completed,
            })
        );
        Ok(())
    }

    #[test]
    fn terminal_frames_ignore_extra_fields() -> Result<(), serde_json::Error> {
        let complete: ProgressEvent =
            serde_json::from_value(json!({"type": "complete", "progress": 100}))?;
        assert_eq!(complete, ProgressEvent::Complete);
        assert!(complete.is_terminal());

        let error: ProgressEvent = serde_json::from_value(json!({"type": "error"}))?;
        assert_eq!(error, ProgressEvent::Error { message: None });
        assert_eq!(error.kind(), "error");
        Ok(())
    }

    #[test]
    fn progress_accepts_integer_percentages() -> Result<(), serde_json::Error> {
        let event: ProgressEvent =
            serde_json::from_value(json!({"type": "progress", "progress": 42}))?;
        assert_eq!(event, ProgressEvent::Progress { progress: 42.0 });
        assert!(!event.is_terminal());
        Ok(())
    }

    #[test]
    fn job_id_is_transparent_on_the_wire() -> Result<(), serde_json::Error> {
        let id = JobId::from("job-7");
        assert_eq!(serde_json::to_value(&id)?, json!("job-7"));
        assert_eq!(id.to_string(), "job-7");
        Ok(())
    }
}
