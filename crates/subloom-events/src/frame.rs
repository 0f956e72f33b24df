//! Decoding of raw stream frames into typed events.
//!
//! # Design
//! - Inspect the `type` discriminator before deserialising so unknown kinds are
//!   rejected by name instead of surfacing as a generic serde failure.
//! - Keep this module transport-free; callers hand over one frame of text.

use serde_json::Value;

use crate::error::{FrameDecodeError, FrameDecodeResult};
use crate::payloads::ProgressEvent;

/// Wire discriminators understood by the client.
pub const EVENT_KINDS: [&str; 4] = ["progress", "line", "complete", "error"];

/// Decode a single JSON frame into a [`ProgressEvent`].
///
/// # Errors
///
/// Returns a [`FrameDecodeError`] when the frame is empty, not JSON, lacks a
/// `type`, names an unknown `type`, or carries fields that do not match it.
pub fn decode_frame(payload: &str) -> FrameDecodeResult<ProgressEvent> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(FrameDecodeError::Empty);
    }

    let value: Value =
        serde_json::from_str(payload).map_err(|source| FrameDecodeError::InvalidJson {
            payload: payload.to_string(),
            source,
        })?;

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(FrameDecodeError::MissingKind {
            payload: payload.to_string(),
        });
    };
    if !EVENT_KINDS.contains(&kind) {
        return Err(FrameDecodeError::UnknownKind {
            kind: kind.to_string(),
        });
    }
    let kind = kind.to_string();

    serde_json::from_value(value).map_err(|source| FrameDecodeError::InvalidFields { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{LineStatus, TranslationLine};

    #[test]
    fn decodes_each_known_kind() -> FrameDecodeResult<()> {
        assert_eq!(
            decode_frame(r#"{"type":"progress","progress":12.5}"#)?,
            ProgressEvent::Progress { progress: 12.5 }
        );
        assert_eq!(
            decode_frame(
                r#"{"type":"line","index":2,"source":"hola","translated":"hello","status":"translating"}"#
            )?,
            ProgressEvent::Line(TranslationLine {
                index: 2,
                source: "hola".into(),
                translated: "hello".into(),
                status: LineStatus::Translating,
            })
        );
        assert_eq!(decode_frame(r#"{"type":"complete"}"#)?, ProgressEvent::Complete);
        assert_eq!(
            decode_frame(r#"{"type":"error","message":"model offline"}"#)?,
            ProgressEvent::Error {
                message: Some("model offline".into())
            }
        );
        Ok(())
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(decode_frame("   "), Err(FrameDecodeError::Empty)));
        assert!(matches!(
            decode_frame("not json"),
            Err(FrameDecodeError::InvalidJson { .. })
        ));
        assert!(matches!(
            decode_frame(r#"{"progress":3}"#),
            Err(FrameDecodeError::MissingKind { .. })
        ));
        assert!(matches!(
            decode_frame(r#"{"type":"progress","progress":"half"}"#),
            Err(FrameDecodeError::InvalidFields { .. })
        ));
    }

    #[test]
    fn rejects_unknown_kind_by_name() {
        let err = decode_frame(r#"{"type":"heartbeat"}"#).expect_err("unknown kind");
        assert_eq!(err.kind(), Some("heartbeat"));
    }
}
