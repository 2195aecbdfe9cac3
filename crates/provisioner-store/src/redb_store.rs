use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use provisioner_domain::{ordinal_lt, LaunchId, LaunchRecord, LaunchState, NodeId, NodeRecord, NodeState};
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::store::StateStore;

const LAUNCHES: TableDefinition<&str, &[u8]> = TableDefinition::new("launches");
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Persistent state store backed by a redb database file.
///
/// Launch and node records survive process restarts. Suitable for a
/// single-process deployment of the provisioner core.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a redb database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        let db = Database::create(path).map_err(|e| StoreError::Internal(e.to_string()))?;

        {
            let wtxn = db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(LAUNCHES).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(NODES).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    fn all_nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(NODES).map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(|e| StoreError::Internal(e.to_string()))? {
            let (_k, v) = entry.map_err(|e| StoreError::Internal(e.to_string()))?;
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }
}

#[async_trait]
impl StateStore for RedbStore {
    async fn put_launch(&self, launch: &LaunchRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(launch)?;
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(LAUNCHES).map_err(|e| StoreError::Internal(e.to_string()))?;
            table
                .insert(launch.launch_id.as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn put_nodes(&self, nodes: &[NodeRecord]) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(NODES).map_err(|e| StoreError::Internal(e.to_string()))?;
            for node in nodes {
                let bytes = serde_json::to_vec(node)?;
                table
                    .insert(node.node_id.as_str(), bytes.as_slice())
                    .map_err(|e| StoreError::Internal(e.to_string()))?;
            }
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn get_launch(&self, launch_id: &LaunchId) -> Result<Option<LaunchRecord>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(LAUNCHES).map_err(|e| StoreError::Internal(e.to_string()))?;
        match table.get(launch_id.as_str()).map_err(|e| StoreError::Internal(e.to_string()))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    async fn get_launches(
        &self,
        state: Option<LaunchState>,
    ) -> Result<Vec<LaunchRecord>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(LAUNCHES).map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(|e| StoreError::Internal(e.to_string()))? {
            let (_k, v) = entry.map_err(|e| StoreError::Internal(e.to_string()))?;
            let launch: LaunchRecord = serde_json::from_slice(v.value())?;
            let keep = match state {
                Some(s) => std::mem::discriminant(&launch.state) == std::mem::discriminant(&s),
                None => true,
            };
            if keep {
                out.push(launch);
            }
        }
        Ok(out)
    }

    async fn get_launch_nodes(&self, launch_id: &LaunchId) -> Result<Vec<NodeRecord>, StoreError> {
        Ok(self
            .all_nodes()?
            .into_iter()
            .filter(|n| &n.launch_id == launch_id)
            .collect())
    }

    async fn get_site_nodes(
        &self,
        site: &str,
        before_state: NodeState,
    ) -> Result<Vec<NodeRecord>, StoreError> {
        Ok(self
            .all_nodes()?
            .into_iter()
            .filter(|n| n.site == site && ordinal_lt(n.state, before_state))
            .collect())
    }

    async fn get_nodes_by_id(&self, ids: &[NodeId]) -> Result<Vec<Option<NodeRecord>>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(NODES).map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let found = table.get(id.as_str()).map_err(|e| StoreError::Internal(e.to_string()))?;
            out.push(match found {
                Some(guard) => Some(serde_json::from_slice(guard.value())?),
                None => None,
            });
        }
        Ok(out)
    }
}
