//! Fake stream connector that records open/close calls.

use std::sync::{Arc, Mutex, PoisonError};

use subloom_events::JobId;
use subloom_progress::{StreamConnector, StreamHandle, SubscriptionKey};

/// Connector call observed by a [`RecordingConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorCall {
    /// A stream was opened.
    Open(SubscriptionKey),
    /// A stream was closed.
    Close(SubscriptionKey),
}

impl ConnectorCall {
    /// Job the call targeted.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        match self {
            Self::Open(key) | Self::Close(key) => &key.job_id,
        }
    }
}

type CallLog = Arc<Mutex<Vec<ConnectorCall>>>;

fn push(log: &CallLog, call: ConnectorCall) {
    log.lock().unwrap_or_else(PoisonError::into_inner).push(call);
}

/// Handle produced by [`RecordingConnector`].
#[derive(Debug)]
pub struct RecordingHandle {
    key: SubscriptionKey,
    log: CallLog,
    closed: bool,
}

impl StreamHandle for RecordingHandle {
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            push(&self.log, ConnectorCall::Close(self.key.clone()));
        }
    }
}

/// Connector that opens nothing and records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    log: CallLog,
}

impl RecordingConnector {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ConnectorCall> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Jobs opened so far, in call order.
    #[must_use]
    pub fn opened(&self) -> Vec<JobId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ConnectorCall::Open(key) => Some(key.job_id),
                ConnectorCall::Close(_) => None,
            })
            .collect()
    }

    /// Jobs closed so far, in call order.
    #[must_use]
    pub fn closed(&self) -> Vec<JobId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ConnectorCall::Close(key) => Some(key.job_id),
                ConnectorCall::Open(_) => None,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl StreamConnector for RecordingConnector {
    type Handle = RecordingHandle;

    fn open(&mut self, key: &SubscriptionKey) -> Self::Handle {
        push(&self.log, ConnectorCall::Open(key.clone()));
        RecordingHandle {
            key: key.clone(),
            log: Arc::clone(&self.log),
            closed: false,
        }
    }
}
