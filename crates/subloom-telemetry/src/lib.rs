#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Telemetry primitives shared across the Subloom workspace.
//!
//! Layout: `init.rs` (subscriber installation), `context.rs` (process-wide span).

pub mod context;
pub mod init;

pub use context::GlobalContextGuard;
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
