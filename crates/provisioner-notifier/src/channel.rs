use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use provisioner_domain::{NodeRecord, Subscriber};
use tokio::sync::mpsc;

use crate::client::Notifier;
use crate::error::NotifierError;

/// Fan-out notifier backed by one `tokio::sync::mpsc` channel per
/// subscriber name, for tests and the CLI's local demo mode — an
/// in-process stand-in for the original's queue-based notifier.
///
/// Channels are unbounded: the core never blocks on a slow subscriber,
/// matching the "fire-and-forget" contract in the original spec's
/// concurrency section. A subscriber registers by calling
/// [`ChannelNotifier::subscribe`] before any launch names it; an
/// unregistered subscriber silently receives nothing (mirrors the
/// original's "subscriber" being an opaque address the core never
/// validates).
#[derive(Default)]
pub struct ChannelNotifier {
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<NodeRecord>>>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return the receiving half.
    pub fn subscribe(&self, subscriber: &Subscriber) -> mpsc::UnboundedReceiver<NodeRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .expect("lock poisoned")
            .insert(subscriber.as_str().to_string(), tx);
        rx
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(
        &self,
        subscribers: &[Subscriber],
        nodes: &[NodeRecord],
    ) -> Result<(), NotifierError> {
        let senders = self.senders.lock().expect("lock poisoned");
        let mut failures = Vec::new();
        for subscriber in subscribers {
            let Some(tx) = senders.get(subscriber.as_str()) else {
                continue;
            };
            for node in nodes {
                if tx.send(node.clone()).is_err() {
                    failures.push(subscriber.as_str().to_string());
                    break;
                }
            }
        }
        if let Some(first) = failures.first() {
            return Err(NotifierError::DeliveryFailed(
                first.clone(),
                "receiver dropped".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use provisioner_domain::{LaunchId, NodeId, NodeState};

    fn node(id: &str) -> NodeRecord {
        NodeRecord::new(
            NodeId::new(id),
            LaunchId::new("l1"),
            NodeState::Requested,
            "site-a".into(),
            "small".into(),
            "group".into(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn delivers_to_registered_subscriber() {
        let notifier = ChannelNotifier::new();
        let mut rx = notifier.subscribe(&Subscriber::new("sub-a"));

        notifier
            .notify(&[Subscriber::new("sub-a")], &[node("n1")])
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.node_id.as_str(), "n1");
    }

    #[tokio::test]
    async fn unregistered_subscriber_is_silently_skipped() {
        let notifier = ChannelNotifier::new();
        notifier
            .notify(&[Subscriber::new("nobody")], &[node("n1")])
            .await
            .unwrap();
    }
}
