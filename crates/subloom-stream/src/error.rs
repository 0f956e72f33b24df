//! # Design
//!
//! - Constant-message errors with structured context, as in the other Subloom crates.
//! - `StreamError` covers client construction; `TransportFailure` describes why a
//!   running stream ended and is rendered into the terminal stream message.

use thiserror::Error;

/// Result type for stream client construction.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors raised while configuring the stream client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The path template lacks the job id placeholder.
    #[error("stream path template is missing the job id placeholder")]
    InvalidPathTemplate {
        /// Offending template.
        template: String,
    },
    /// The base URL cannot carry path segments.
    #[error("stream base url cannot be a base")]
    InvalidBaseUrl {
        /// Offending URL.
        url: String,
    },
}

/// Reasons a running stream ended.
#[derive(Debug, Error)]
pub enum TransportFailure {
    /// The request could not be built for the job.
    #[error("stream url invalid")]
    Url {
        /// Underlying configuration error.
        source: StreamError,
    },
    /// The connection could not be established.
    #[error("stream connection failed")]
    Connect {
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// The server answered the handshake with a non-success status.
    #[error("stream handshake rejected")]
    Handshake {
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// Reading the response body failed mid-stream.
    #[error("stream read failed")]
    Read {
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// The server ended the response body.
    #[error("stream closed by server")]
    Closed,
}

impl TransportFailure {
    /// Human-readable reason carried by the terminal stream message.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Url { source } => format!("{self}: {source}"),
            Self::Connect { source } | Self::Read { source } => format!("{self}: {source}"),
            Self::Handshake { status } => format!("{self}: HTTP {status}"),
            Self::Closed => self.to_string(),
        }
    }
}
