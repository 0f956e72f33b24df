//! Per-job progress reducer.
//!
//! # Design
//! - Lines are keyed by index in a `BTreeMap`, so upserts are logarithmic and the
//!   ascending view falls out of iteration order.
//! - `completed` and `error` are sticky: once reached, every later message is a no-op.
//! - Terminal transitions are returned to the caller exactly once.

use std::collections::BTreeMap;

use subloom_events::{
    DEFAULT_ERROR_MESSAGE, LineIndex, LineStatus, ProgressEvent, StreamMessage, TranslationLine,
};

/// Upper bound of the progress percentage.
pub const MAX_PERCENT: f64 = 100.0;

/// Connection/translation status of a single job preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PreviewStatus {
    /// Waiting for the transport to confirm the connection.
    #[default]
    Connecting,
    /// Connected and receiving updates.
    Translating,
    /// The job completed. Terminal.
    Completed,
    /// The job or its stream failed. Terminal.
    Error,
}

impl PreviewStatus {
    /// Whether no further updates will be applied.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Display label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Translating => "translating",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Terminal transition produced by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The job completed.
    Completed,
    /// The job or its stream failed.
    Failed {
        /// Failure detail.
        message: String,
    },
}

/// Consistent snapshot of one job's streamed progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobProgress {
    status: PreviewStatus,
    progress_percent: f64,
    lines: BTreeMap<LineIndex, TranslationLine>,
    error_message: Option<String>,
}

impl JobProgress {
    /// Fresh state: connecting, 0 %, no lines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> PreviewStatus {
        self.status
    }

    /// Current percentage in `[0, 100]`.
    #[must_use]
    pub const fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    /// Failure detail once the state reached [`PreviewStatus::Error`].
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Whether the state is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Lines in ascending index order.
    pub fn lines(&self) -> impl Iterator<Item = &TranslationLine> {
        self.lines.values()
    }

    /// Look up a single line.
    #[must_use]
    pub fn line(&self, index: LineIndex) -> Option<&TranslationLine> {
        self.lines.get(&index)
    }

    /// Number of distinct lines received.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of lines whose translation finished.
    #[must_use]
    pub fn completed_lines(&self) -> usize {
        self.lines
            .values()
            .filter(|line| line.status == LineStatus::Completed)
            .count()
    }

    /// Highest line index seen so far.
    #[must_use]
    pub fn last_index(&self) -> Option<LineIndex> {
        self.lines.keys().next_back().copied()
    }

    /// Record that the transport confirmed the connection.
    pub fn mark_open(&mut self) {
        if self.status == PreviewStatus::Connecting {
            self.status = PreviewStatus::Translating;
        }
    }

    /// Apply any stream message, including transport failures.
    pub fn apply_message(&mut self, message: StreamMessage) -> Option<Transition> {
        match message {
            StreamMessage::Opened => {
                self.mark_open();
                None
            }
            StreamMessage::Event(event) => self.apply(event),
            StreamMessage::TransportError { reason } => self.fail(reason),
        }
    }

    /// Apply a decoded progress event.
    pub fn apply(&mut self, event: ProgressEvent) -> Option<Transition> {
        if self.is_terminal() {
            return None;
        }
        match event {
            ProgressEvent::Progress { progress } => {
                if progress.is_finite() {
                    self.progress_percent = progress.clamp(0.0, MAX_PERCENT);
                }
                None
            }
            ProgressEvent::Line(line) => {
                self.lines.insert(line.index, line);
                None
            }
            ProgressEvent::Complete => {
                self.status = PreviewStatus::Completed;
                self.progress_percent = MAX_PERCENT;
                Some(Transition::Completed)
            }
            ProgressEvent::Error { message } => {
                let message = message
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
                self.fail(message)
            }
        }
    }

    fn fail(&mut self, message: String) -> Option<Transition> {
        if self.is_terminal() {
            return None;
        }
        self.status = PreviewStatus::Error;
        self.error_message = Some(message.clone());
        Some(Transition::Failed { message })
    }
}
