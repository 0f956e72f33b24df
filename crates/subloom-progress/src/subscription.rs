//! Transport seam between the subscription manager and stream connections.

use std::fmt::{self, Display, Formatter};

use subloom_events::JobId;

/// Identity of one opened stream connection.
///
/// The generation distinguishes a re-opened stream from a closed predecessor
/// for the same job, so late messages from the old connection can be dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// Job the stream belongs to.
    pub job_id: JobId,
    /// Manager-assigned sequence number.
    pub generation: u64,
}

impl SubscriptionKey {
    /// Build a key.
    #[must_use]
    pub const fn new(job_id: JobId, generation: u64) -> Self {
        Self { job_id, generation }
    }
}

impl Display for SubscriptionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}#{}", self.job_id, self.generation)
    }
}

/// Handle to an open stream connection.
pub trait StreamHandle {
    /// Close the connection. Must be idempotent; no messages are delivered afterwards.
    fn close(&mut self);
}

/// Factory for stream connections.
pub trait StreamConnector {
    /// Handle type returned for each opened stream.
    type Handle: StreamHandle;

    /// Start connecting the stream identified by `key` without blocking.
    fn open(&mut self, key: &SubscriptionKey) -> Self::Handle;
}
