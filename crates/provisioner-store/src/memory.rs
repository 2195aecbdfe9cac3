use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use provisioner_domain::{ordinal_lt, LaunchId, LaunchRecord, LaunchState, NodeId, NodeRecord, NodeState};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::StateStore;

#[derive(Debug, Default)]
struct Inner {
    launches: HashMap<LaunchId, LaunchRecord>,
    nodes: HashMap<NodeId, NodeRecord>,
}

/// In-memory implementation of [`StateStore`].
///
/// All data is lost on process exit. Used by tests and the CLI's local
/// demo mode.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn put_launch(&self, launch: &LaunchRecord) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.launches.insert(launch.launch_id.clone(), launch.clone());
        Ok(())
    }

    async fn put_nodes(&self, nodes: &[NodeRecord]) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        for node in nodes {
            guard.nodes.insert(node.node_id.clone(), node.clone());
        }
        Ok(())
    }

    async fn get_launch(&self, launch_id: &LaunchId) -> Result<Option<LaunchRecord>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.launches.get(launch_id).cloned())
    }

    async fn get_launches(
        &self,
        state: Option<LaunchState>,
    ) -> Result<Vec<LaunchRecord>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .launches
            .values()
            .filter(|l| match state {
                Some(s) => launch_state_eq(l.state, s),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_launch_nodes(&self, launch_id: &LaunchId) -> Result<Vec<NodeRecord>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .nodes
            .values()
            .filter(|n| &n.launch_id == launch_id)
            .cloned()
            .collect())
    }

    async fn get_site_nodes(
        &self,
        site: &str,
        before_state: NodeState,
    ) -> Result<Vec<NodeRecord>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .nodes
            .values()
            .filter(|n| n.site == site && ordinal_lt(n.state, before_state))
            .cloned()
            .collect())
    }

    async fn get_nodes_by_id(&self, ids: &[NodeId]) -> Result<Vec<Option<NodeRecord>>, StoreError> {
        let guard = self.inner.read().await;
        Ok(ids.iter().map(|id| guard.nodes.get(id).cloned()).collect())
    }
}

fn launch_state_eq(a: LaunchState, b: LaunchState) -> bool {
    std::mem::discriminant(&a) == std::mem::discriminant(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dummy_launch(id: &str, state: LaunchState) -> LaunchRecord {
        LaunchRecord::new(LaunchId::new(id), "dt".into(), vec![], state)
    }

    fn dummy_node(id: &str, launch_id: &str, site: &str, state: NodeState) -> NodeRecord {
        NodeRecord::new(
            NodeId::new(id),
            LaunchId::new(launch_id),
            state,
            site.into(),
            "small".into(),
            "group".into(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn put_and_get_launch() {
        let store = InMemoryStore::new();
        store.put_launch(&dummy_launch("l1", LaunchState::Requested)).await.unwrap();
        let got = store.get_launch(&LaunchId::new("l1")).await.unwrap();
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn get_launches_filters_by_state() {
        let store = InMemoryStore::new();
        store.put_launch(&dummy_launch("l1", LaunchState::Pending)).await.unwrap();
        store.put_launch(&dummy_launch("l2", LaunchState::Failed)).await.unwrap();

        let pending = store.get_launches(Some(LaunchState::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].launch_id.as_str(), "l1");
    }

    #[tokio::test]
    async fn get_site_nodes_excludes_terminated_and_other_sites() {
        let store = InMemoryStore::new();
        store.put_nodes(&[
            dummy_node("n1", "l1", "site-a", NodeState::Pending),
            dummy_node("n2", "l1", "site-a", NodeState::Terminated),
            dummy_node("n3", "l1", "site-b", NodeState::Pending),
        ]).await.unwrap();

        let nodes = store.get_site_nodes("site-a", NodeState::Terminated).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_id.as_str(), "n1");
    }

    #[tokio::test]
    async fn get_nodes_by_id_preserves_order_and_unknowns() {
        let store = InMemoryStore::new();
        store.put_nodes(&[dummy_node("n1", "l1", "site-a", NodeState::Pending)]).await.unwrap();

        let got = store
            .get_nodes_by_id(&[NodeId::new("n1"), NodeId::new("missing")])
            .await
            .unwrap();
        assert!(got[0].is_some());
        assert!(got[1].is_none());
    }
}
