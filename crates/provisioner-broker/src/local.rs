use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use provisioner_domain::ContextInfo;

use crate::client::ContextBrokerClient;
use crate::error::BrokerError;
use crate::status::{ContextStatus, CtxIdentity, CtxNode};

#[derive(Default)]
struct ContextState {
    expected_count: usize,
    nodes: Vec<CtxNode>,
}

/// In-process fake context broker, for tests and the CLI's local demo
/// mode. A context completes once as many nodes have been reported (via
/// [`LocalBroker::report_node`], a test-only hook standing in for nodes
/// phoning home) as `expected_count` set by
/// [`LocalBroker::set_expected_count`].
#[derive(Default)]
pub struct LocalBroker {
    next_id: AtomicU64,
    contexts: Mutex<HashMap<String, ContextState>>,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_expected_count(&self, uri: &str, count: usize) {
        let mut guard = self.contexts.lock().expect("lock poisoned");
        guard.entry(uri.to_string()).or_default().expected_count = count;
    }

    pub fn report_node(&self, uri: &str, node: CtxNode) {
        let mut guard = self.contexts.lock().expect("lock poisoned");
        guard.entry(uri.to_string()).or_default().nodes.push(node);
    }
}

#[async_trait]
impl ContextBrokerClient for LocalBroker {
    async fn create(&self) -> Result<ContextInfo, BrokerError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let uri = format!("local-ctx-{id}");
        self.contexts.lock().expect("lock poisoned").insert(uri.clone(), ContextState::default());
        Ok(ContextInfo { uri })
    }

    async fn query(&self, uri: &str) -> Result<ContextStatus, BrokerError> {
        let guard = self.contexts.lock().expect("lock poisoned");
        let state = guard
            .get(uri)
            .ok_or_else(|| BrokerError(format!("unknown context: {uri}")))?;

        let nodes = state.nodes.clone();
        let complete = state.expected_count > 0 && nodes.len() >= state.expected_count;

        Ok(ContextStatus { nodes, complete, expected_count: state.expected_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_completes_once_expected_count_reports_in() {
        let broker = LocalBroker::new();
        let ctx = broker.create().await.unwrap();
        broker.set_expected_count(&ctx.uri, 2);

        let status = broker.query(&ctx.uri).await.unwrap();
        assert!(!status.complete);

        broker.report_node(
            &ctx.uri,
            CtxNode {
                identities: vec![CtxIdentity { ip: Some("1.2.3.4".into()), ..Default::default() }],
                ok_occurred: true,
                ..Default::default()
            },
        );
        broker.report_node(
            &ctx.uri,
            CtxNode {
                identities: vec![CtxIdentity { ip: Some("1.2.3.5".into()), ..Default::default() }],
                ok_occurred: true,
                ..Default::default()
            },
        );

        let status = broker.query(&ctx.uri).await.unwrap();
        assert!(status.complete);
        assert_eq!(status.nodes.len(), 2);
    }

    #[tokio::test]
    async fn query_unknown_context_fails() {
        let broker = LocalBroker::new();
        assert!(broker.query("nope").await.is_err());
    }
}
