//! Stream connector that multiplexes many job streams into one channel.

use subloom_events::StreamMessage;
use subloom_progress::{StreamConnector, StreamHandle, SubscriptionKey};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::client::{MessageSink, ProgressStreamClient};

/// Stream message tagged with the subscription that produced it.
pub type TaggedMessage = (SubscriptionKey, StreamMessage);

struct TaggedSink {
    key: SubscriptionKey,
    sender: UnboundedSender<TaggedMessage>,
}

impl MessageSink for TaggedSink {
    fn deliver(&mut self, message: StreamMessage) -> bool {
        self.sender.send((self.key.clone(), message)).is_ok()
    }
}

/// Opens HTTP streams and forwards their messages into a shared channel.
#[derive(Debug)]
pub struct ChannelConnector {
    client: ProgressStreamClient,
    sender: UnboundedSender<TaggedMessage>,
}

impl ChannelConnector {
    /// Create a connector and the receiver its streams report to.
    #[must_use]
    pub fn new(client: ProgressStreamClient) -> (Self, UnboundedReceiver<TaggedMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { client, sender }, receiver)
    }
}

impl StreamConnector for ChannelConnector {
    type Handle = StreamTask;

    fn open(&mut self, key: &SubscriptionKey) -> Self::Handle {
        let sink = TaggedSink {
            key: key.clone(),
            sender: self.sender.clone(),
        };
        StreamTask {
            task: self.client.spawn(key.job_id.clone(), sink),
        }
    }
}

/// Handle to a spawned stream task; closing or dropping it aborts the task.
#[derive(Debug)]
pub struct StreamTask {
    task: Option<JoinHandle<()>>,
}

impl StreamTask {
    /// Whether the task has been aborted or was never started.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

impl StreamHandle for StreamTask {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StreamTask {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::Client;
    use subloom_events::{JobId, ProgressEvent};
    use url::Url;

    #[tokio::test]
    async fn messages_are_tagged_with_their_subscription() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/jobs/j1/stream");
                then.status(200).body("{\"type\":\"progress\",\"progress\":5}\n");
            })
            .await;

        let base = Url::parse(&server.base_url()).expect("mock server url");
        let (mut connector, mut receiver) =
            ChannelConnector::new(ProgressStreamClient::new(Client::new(), base));
        let key = SubscriptionKey::new(JobId::from("j1"), 7);
        let _handle = connector.open(&key);

        let mut received = Vec::new();
        while let Some((tag, message)) = receiver.recv().await {
            assert_eq!(tag, key);
            let terminal = matches!(message, StreamMessage::TransportError { .. });
            received.push(message);
            if terminal {
                break;
            }
        }
        assert_eq!(
            received,
            vec![
                StreamMessage::Opened,
                StreamMessage::Event(ProgressEvent::Progress { progress: 5.0 }),
                StreamMessage::TransportError {
                    reason: "stream closed by server".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let base = Url::parse("http://127.0.0.1:9").expect("url");
        let (mut connector, _receiver) =
            ChannelConnector::new(ProgressStreamClient::new(Client::new(), base));
        let mut handle = connector.open(&SubscriptionKey::new(JobId::from("j"), 1));
        assert!(!handle.is_closed());
        handle.close();
        handle.close();
        assert!(handle.is_closed());
    }
}
