//! Incremental frame parser for progress stream bodies.
//!
//! # Design
//! - Accept arbitrary network chunks and emit complete frame payloads as soon as
//!   their terminating newline arrives.
//! - Plain lines are newline-delimited JSON frames. `data:` lines are buffered
//!   until a blank line, as Server-Sent Events framing requires.
//! - Comment lines and other SSE fields are skipped here; payload validation
//!   happens in `subloom_events::decode_frame`.
//! - Frames longer than the configured limit or not valid UTF-8 are dropped
//!   with a warning; the stream keeps going.

use tracing::warn;

/// Largest frame, in bytes, the parser buffers before dropping it.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Reassembles frame payloads from streamed chunks.
#[derive(Debug)]
pub struct FrameParser {
    line: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
    max_frame_bytes: usize,
    skipping_line: bool,
    skipping_data: bool,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::with_max_frame_bytes(MAX_FRAME_BYTES)
    }
}

impl FrameParser {
    /// Create an empty parser with the [`MAX_FRAME_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty parser that drops frames longer than `limit` bytes.
    #[must_use]
    pub const fn with_max_frame_bytes(limit: usize) -> Self {
        Self {
            line: Vec::new(),
            data: Vec::new(),
            data_len: 0,
            max_frame_bytes: if limit == 0 { 1 } else { limit },
            skipping_line: false,
            skipping_data: false,
        }
    }

    /// Feed one chunk and return every payload it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        for byte in chunk {
            match *byte {
                b'\n' => {
                    let line = std::mem::take(&mut self.line);
                    if !std::mem::take(&mut self.skipping_line) {
                        self.finish_line(&line, &mut frames);
                    }
                }
                _ if self.skipping_line => {}
                _ if self.line.len() >= self.max_frame_bytes => {
                    warn!(
                        limit = self.max_frame_bytes,
                        "dropping progress frame that exceeds the size limit"
                    );
                    self.line = Vec::new();
                    self.skipping_line = true;
                }
                byte => self.line.push(byte),
            }
        }
        frames
    }

    /// Flush a trailing frame left without a final newline.
    pub fn finish(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        let line = std::mem::take(&mut self.line);
        if !std::mem::take(&mut self.skipping_line) && !line.is_empty() {
            self.finish_line(&line, &mut frames);
        }
        self.flush_data(&mut frames);
        frames
    }

    fn finish_line(&mut self, raw: &[u8], frames: &mut Vec<String>) {
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    error = %err,
                    len = raw.len(),
                    "dropping progress frame that is not valid UTF-8"
                );
                return;
            }
        };
        let line = text.strip_suffix('\r').unwrap_or(text);

        if line.trim().is_empty() {
            self.flush_data(frames);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.push_data(value.strip_prefix(' ').unwrap_or(value));
            return;
        }
        if ["event:", "id:", "retry:"]
            .iter()
            .any(|field| line.starts_with(field))
        {
            return;
        }

        self.flush_data(frames);
        frames.push(line.to_string());
    }

    fn push_data(&mut self, value: &str) {
        if self.skipping_data {
            return;
        }
        let len = self.data_len + value.len() + usize::from(!self.data.is_empty());
        if len > self.max_frame_bytes {
            warn!(
                limit = self.max_frame_bytes,
                "dropping progress event that exceeds the size limit"
            );
            self.data.clear();
            self.data_len = 0;
            self.skipping_data = true;
            return;
        }
        self.data_len = len;
        self.data.push(value.to_string());
    }

    fn flush_data(&mut self, frames: &mut Vec<String>) {
        self.skipping_data = false;
        self.data_len = 0;
        if self.data.is_empty() {
            return;
        }
        frames.push(self.data.join("\n"));
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_newline_delimited_frames() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"{\"type\":\"complete\"}\n{\"type\":\"error\"}\n");
        assert_eq!(frames, vec![r#"{"type":"complete"}"#, r#"{"type":"error"}"#]);
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn reassembles_frames_split_across_chunks() {
        let mut parser = FrameParser::new();
        assert!(parser.push(b"{\"type\":\"pro").is_empty());
        assert!(parser.push(b"gress\",\"progress\":").is_empty());
        let frames = parser.push(b"42}\r\n");
        assert_eq!(frames, vec![r#"{"type":"progress","progress":42}"#]);
    }

    #[test]
    fn reassembles_multibyte_characters_split_across_chunks() {
        let mut parser = FrameParser::new();
        let payload = "{\"translated\":\"héllo\"}\n".as_bytes();
        let split = payload
            .iter()
            .position(|byte| *byte == 0xC3)
            .map_or(1, |index| index + 1);
        assert!(parser.push(&payload[..split]).is_empty());
        let frames = parser.push(&payload[split..]);
        assert_eq!(frames, vec![r#"{"translated":"héllo"}"#]);
    }

    #[test]
    fn accepts_sse_framing() {
        let mut parser = FrameParser::new();
        let frames = parser.push(
            b": keep-alive\nevent: progress\nid: 7\nretry: 1000\ndata: {\"type\":\"complete\"}\n\n",
        );
        assert_eq!(frames, vec![r#"{"type":"complete"}"#]);
    }

    #[test]
    fn joins_multi_line_sse_data() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"data: {\"type\":\ndata: \"complete\"}\n\n");
        assert_eq!(frames, vec!["{\"type\":\n\"complete\"}"]);
    }

    #[test]
    fn skips_blank_lines_between_frames() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"\n\r\n{\"type\":\"complete\"}\n\n");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn flushes_trailing_frame_at_end_of_stream() {
        let mut parser = FrameParser::new();
        assert!(parser.push(b"{\"type\":\"complete\"}").is_empty());
        assert_eq!(parser.finish(), vec![r#"{"type":"complete"}"#]);

        let mut sse = FrameParser::new();
        assert!(sse.push(b"data: {\"type\":\"complete\"}\n").is_empty());
        assert_eq!(sse.finish(), vec![r#"{"type":"complete"}"#]);
    }

    #[test]
    fn drops_frames_that_are_not_utf8() {
        let mut parser = FrameParser::new();
        let frames = parser.push(
            b"{\"type\":\"line\",\"index\":0,\"translated\":\"\xff\xfe\"}\n{\"type\":\"complete\"}\n",
        );
        assert_eq!(frames, vec![r#"{"type":"complete"}"#]);
    }

    #[test]
    fn drops_oversized_lines_until_the_next_newline() {
        let mut parser = FrameParser::with_max_frame_bytes(24);
        assert!(parser.push(b"{\"type\":\"line\",\"translated\":\"").is_empty());
        assert!(parser.push(b"much longer than the limit\"}").is_empty());
        let frames = parser.push(b"\n{\"type\":\"complete\"}\n");
        assert_eq!(frames, vec![r#"{"type":"complete"}"#]);

        assert!(parser.push(b"{\"type\":\"error\",\"message\":\"cut off\"}").is_empty());
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn drops_oversized_sse_events_until_the_blank_line() {
        let mut parser = FrameParser::with_max_frame_bytes(24);
        let frames = parser.push(
            b"data: {\"type\":\"line\",\ndata: \"translated\":\"too long\"}\n\ndata: {\"type\":\"complete\"}\n\n",
        );
        assert_eq!(frames, vec![r#"{"type":"complete"}"#]);
    }
}
