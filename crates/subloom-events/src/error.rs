//! Frame decoding error primitives.

use thiserror::Error;

/// Error emitted when a stream frame cannot be turned into a [`crate::ProgressEvent`].
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    /// The frame carried no payload.
    #[error("empty progress frame")]
    Empty,
    /// The payload was not valid JSON.
    #[error("progress frame is not valid json")]
    InvalidJson {
        /// Raw payload text.
        payload: String,
        /// Underlying parser error.
        source: serde_json::Error,
    },
    /// The payload had no string `type` discriminator.
    #[error("progress frame is missing its type")]
    MissingKind {
        /// Raw payload text.
        payload: String,
    },
    /// The `type` discriminator named an unsupported event.
    #[error("unknown progress frame type")]
    UnknownKind {
        /// Discriminator supplied by the backend.
        kind: String,
    },
    /// The discriminator was known but the fields did not match it.
    #[error("progress frame fields are invalid")]
    InvalidFields {
        /// Discriminator supplied by the backend.
        kind: String,
        /// Underlying deserialisation error.
        source: serde_json::Error,
    },
}

impl FrameDecodeError {
    /// Discriminator associated with the failure, when one was present.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::UnknownKind { kind } | Self::InvalidFields { kind, .. } => Some(kind),
            Self::Empty | Self::InvalidJson { .. } | Self::MissingKind { .. } => None,
        }
    }
}

/// Result wrapper for frame decoding.
pub type FrameDecodeResult<T> = Result<T, FrameDecodeError>;
