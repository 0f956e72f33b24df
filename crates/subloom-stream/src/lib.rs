#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Progress stream transport for Subloom jobs.
//!
//! Layout: `parser.rs` (chunk reassembly), `client.rs` (per-job HTTP streams),
//! `connector.rs` (multiplexed streams for the subscription manager), `error.rs`.

pub mod client;
pub mod connector;
pub mod error;
pub mod parser;

pub use client::{DEFAULT_STREAM_PATH, JOB_ID_PLACEHOLDER, ProgressStreamClient, Subscription};
pub use connector::{ChannelConnector, StreamTask, TaggedMessage};
pub use error::{StreamError, StreamResult, TransportFailure};
pub use parser::{FrameParser, MAX_FRAME_BYTES};
