use async_trait::async_trait;
use provisioner_domain::{NodeRecord, Subscriber};
use tracing::info;

use crate::client::Notifier;
use crate::error::NotifierError;

/// Notifier that just emits a `tracing` event per record, for the CLI
/// demo when no subscriber is actually listening.
#[derive(Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        subscribers: &[Subscriber],
        nodes: &[NodeRecord],
    ) -> Result<(), NotifierError> {
        for subscriber in subscribers {
            for node in nodes {
                info!(
                    subscriber = subscriber.as_str(),
                    node_id = node.node_id.as_str(),
                    state = %node.state,
                    "node state notification"
                );
            }
        }
        Ok(())
    }
}
