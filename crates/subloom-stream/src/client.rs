//! HTTP progress stream client.
//!
//! # Design
//! - `open` returns immediately; the connection runs as a tokio task and reports
//!   `Opened`, one `Event` per decoded frame, then at most one `TransportError`.
//! - Malformed frames are logged and dropped without ending the stream.
//! - Closing aborts the task; nothing is delivered after close.
//! - No reconnects. The caller decides whether to open a new stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{Stream, StreamExt};
use reqwest::Client;
use subloom_events::{JobId, StreamMessage, decode_frame};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{StreamError, StreamResult, TransportFailure};
use crate::parser::FrameParser;

/// Placeholder substituted with the job id in the stream path template.
pub const JOB_ID_PLACEHOLDER: &str = "{job_id}";
/// Default stream path template.
pub const DEFAULT_STREAM_PATH: &str = "/api/jobs/{job_id}/stream";
/// Header carrying the API key.
pub const HEADER_API_KEY: &str = "x-api-key";

/// Destination for messages produced by a stream task.
pub(crate) trait MessageSink: Send + 'static {
    /// Deliver a message; `false` means the receiver is gone and the task should stop.
    fn deliver(&mut self, message: StreamMessage) -> bool;
}

impl MessageSink for UnboundedSender<StreamMessage> {
    fn deliver(&mut self, message: StreamMessage) -> bool {
        self.send(message).is_ok()
    }
}

/// Opens per-job progress streams against the backend.
#[derive(Debug, Clone)]
pub struct ProgressStreamClient {
    http: Client,
    base_url: Url,
    path_template: String,
    api_key: Option<String>,
}

impl ProgressStreamClient {
    /// Client using the default stream path and no API key.
    ///
    /// The HTTP client must not carry a total request timeout, or long-running
    /// streams are cut off.
    #[must_use]
    pub fn new(http: Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            path_template: DEFAULT_STREAM_PATH.to_string(),
            api_key: None,
        }
    }

    /// Override the stream path template.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidPathTemplate`] when the template does not
    /// contain [`JOB_ID_PLACEHOLDER`].
    pub fn with_path_template(mut self, template: impl Into<String>) -> StreamResult<Self> {
        let template = template.into();
        if !template.contains(JOB_ID_PLACEHOLDER) {
            return Err(StreamError::InvalidPathTemplate { template });
        }
        self.path_template = template;
        Ok(self)
    }

    /// Send `key` in the API key header on every stream request.
    #[must_use]
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|value| !value.trim().is_empty());
        self
    }

    /// Endpoint URL for one job's stream.
    ///
    /// The template is appended to the base URL path; the job id is
    /// percent-encoded as a path segment.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidBaseUrl`] when the base URL cannot hold a path.
    pub fn stream_url(&self, job_id: &JobId) -> StreamResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments =
                url.path_segments_mut()
                    .map_err(|()| StreamError::InvalidBaseUrl {
                        url: self.base_url.to_string(),
                    })?;
            segments.pop_if_empty();
            for segment in self.path_template.split('/').filter(|part| !part.is_empty()) {
                segments.push(&segment.replace(JOB_ID_PLACEHOLDER, job_id.as_str()));
            }
        }
        Ok(url)
    }

    /// Open the stream for `job_id` as an owned subscription.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn open(&self, job_id: &JobId) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = self.spawn(job_id.clone(), sender);
        Subscription::new(job_id.clone(), receiver, task)
    }

    pub(crate) fn spawn<S: MessageSink>(&self, job_id: JobId, mut sink: S) -> Option<JoinHandle<()>> {
        let url = match self.stream_url(&job_id) {
            Ok(url) => url,
            Err(source) => {
                let failure = TransportFailure::Url { source };
                warn!(job_id = %job_id, error = %failure.reason(), "progress stream not opened");
                sink.deliver(StreamMessage::TransportError {
                    reason: failure.reason(),
                });
                return None;
            }
        };
        let mut request = self.http.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(HEADER_API_KEY, key);
        }
        Some(tokio::spawn(run_stream(job_id, request, sink)))
    }
}

async fn run_stream<S: MessageSink>(job_id: JobId, request: reqwest::RequestBuilder, mut sink: S) {
    let failure = pump(&job_id, request, &mut sink).await;
    match failure {
        None => debug!(job_id = %job_id, "progress stream receiver dropped"),
        Some(failure) => {
            debug!(job_id = %job_id, reason = %failure.reason(), "progress stream ended");
            sink.deliver(StreamMessage::TransportError {
                reason: failure.reason(),
            });
        }
    }
}

/// Drive one connection; `None` means the receiver went away first.
async fn pump<S: MessageSink>(
    job_id: &JobId,
    request: reqwest::RequestBuilder,
    sink: &mut S,
) -> Option<TransportFailure> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(source) => return Some(TransportFailure::Connect { source }),
    };
    if !response.status().is_success() {
        return Some(TransportFailure::Handshake {
            status: response.status().as_u16(),
        });
    }
    if !sink.deliver(StreamMessage::Opened) {
        return None;
    }

    let mut parser = FrameParser::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(source) => return Some(TransportFailure::Read { source }),
        };
        for payload in parser.push(&bytes) {
            if !forward_frame(job_id, &payload, sink) {
                return None;
            }
        }
    }
    for payload in parser.finish() {
        if !forward_frame(job_id, &payload, sink) {
            return None;
        }
    }
    Some(TransportFailure::Closed)
}

fn forward_frame<S: MessageSink>(job_id: &JobId, payload: &str, sink: &mut S) -> bool {
    match decode_frame(payload) {
        Ok(event) => {
            trace!(job_id = %job_id, kind = event.kind(), "progress frame decoded");
            sink.deliver(StreamMessage::Event(event))
        }
        Err(err) => {
            warn!(
                job_id = %job_id,
                kind = err.kind().unwrap_or("-"),
                error = %err,
                "dropping malformed progress frame"
            );
            true
        }
    }
}

/// Owned, finite stream of messages for one job.
///
/// Dropping the subscription closes it.
#[derive(Debug)]
pub struct Subscription {
    job_id: JobId,
    messages: UnboundedReceiverStream<StreamMessage>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

impl Subscription {
    fn new(
        job_id: JobId,
        receiver: UnboundedReceiver<StreamMessage>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            job_id,
            messages: UnboundedReceiverStream::new(receiver),
            task,
            closed: false,
        }
    }

    /// Job this subscription follows.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop the connection. Idempotent; buffered messages are discarded.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.messages.close();
        debug!(job_id = %self.job_id, "progress subscription closed");
    }
}

impl Stream for Subscription {
    type Item = StreamMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.closed {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.messages).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
