use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use provisioner_domain::{LaunchId, LaunchRecord, LaunchState, NodeId, NodeRecord, NodeState};

use crate::error::StoreError;

#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Write a launch record, replacing any existing record with the same id.
    async fn put_launch(&self, launch: &LaunchRecord) -> Result<(), StoreError>;

    /// Write a batch of node records, replacing existing records with the
    /// same id. Persisted as a single unit from the caller's perspective.
    async fn put_nodes(&self, nodes: &[NodeRecord]) -> Result<(), StoreError>;

    async fn get_launch(&self, launch_id: &LaunchId) -> Result<Option<LaunchRecord>, StoreError>;

    /// All launches, optionally filtered to a single [`LaunchState`].
    async fn get_launches(
        &self,
        state: Option<LaunchState>,
    ) -> Result<Vec<LaunchRecord>, StoreError>;

    async fn get_launch_nodes(&self, launch_id: &LaunchId) -> Result<Vec<NodeRecord>, StoreError>;

    /// Nodes at `site` whose state is ordinally below `before_state`
    /// (per [`provisioner_domain::ordinal_lt`]).
    async fn get_site_nodes(
        &self,
        site: &str,
        before_state: NodeState,
    ) -> Result<Vec<NodeRecord>, StoreError>;

    /// Look up nodes by id, preserving input order. `None` at a position
    /// means that id is unknown to the store.
    async fn get_nodes_by_id(&self, ids: &[NodeId]) -> Result<Vec<Option<NodeRecord>>, StoreError>;
}

/// Stable grouping of records by a caller-supplied key function, in the
/// style of the original's `group_records(records, 'ctx_name')`.
pub fn group_records<T, K, F>(records: Vec<T>, key_fn: F) -> HashMap<K, Vec<T>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for record in records {
        let key = key_fn(&record);
        groups.entry(key).or_default().push(record);
    }
    groups
}

/// Seconds since a node record was created, used by the reconciler's
/// startup grace window.
pub fn calc_record_age(node: &NodeRecord, now: DateTime<Utc>) -> i64 {
    node.age_seconds(now)
}
