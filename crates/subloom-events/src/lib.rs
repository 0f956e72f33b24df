#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Progress stream payloads for the Subloom client.
//!
//! Layout: `payloads.rs` (job ids, lines, events, stream messages), `frame.rs`
//! (frame decoding), `error.rs` (decode errors).

pub mod error;
pub mod frame;
pub mod payloads;

pub use error::{FrameDecodeError, FrameDecodeResult};
pub use frame::{EVENT_KINDS, decode_frame};
pub use payloads::{
    DEFAULT_ERROR_MESSAGE, JobId, LineIndex, LineStatus, ProgressEvent, StreamMessage,
    TranslationLine,
};
