//! Command handlers grouped by concern.

pub(crate) mod jobs;
pub(crate) mod preview;
pub(crate) mod settings;
pub(crate) mod watch;
