#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Live progress reconciliation for Subloom jobs.
//!
//! Layout: `reducer.rs` (per-job state), `subscription.rs` (transport seam),
//! `manager.rs` (one stream per running job), `gate.rs` (poll ordering),
//! `listing.rs` (client-side filtering and pagination).

pub mod gate;
pub mod listing;
pub mod manager;
pub mod reducer;
pub mod subscription;

pub use gate::{PollTicket, SnapshotGate};
pub use listing::{JobFilter, Page, display_progress, filter_jobs, paginate, running_ids};
pub use manager::{MessageOutcome, ReconcileReport, SubscriptionManager};
pub use reducer::{JobProgress, MAX_PERCENT, PreviewStatus, Transition};
pub use subscription::{StreamConnector, StreamHandle, SubscriptionKey};
