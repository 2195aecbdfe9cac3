use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use provisioner_domain::IaasState;
use serde_json::json;
use tracing::debug;

use crate::driver::{Driver, IaasNode, LaunchSpec};
use crate::error::DriverError;

/// In-process fake IaaS driver for one site.
///
/// Launched nodes are minted with a synthetic id and IP, start out
/// `PENDING`, and flip to `RUNNING` the next time [`Driver::list_nodes`]
/// is polled — standing in for the original's nimbus/EC2 test doubles
/// without a real cloud round trip.
pub struct LocalDriver {
    site: String,
    next_id: AtomicU64,
    nodes: Mutex<Vec<IaasNode>>,
}

impl LocalDriver {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            next_id: AtomicU64::new(1),
            nodes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Driver for LocalDriver {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list_nodes(&self) -> Result<Vec<IaasNode>, DriverError> {
        let mut guard = self.nodes.lock().map_err(|_| DriverError::Internal("poisoned lock".into()))?;
        for node in guard.iter_mut() {
            if node.state == IaasState::Pending {
                node.state = IaasState::Running;
            }
        }
        Ok(guard.clone())
    }

    async fn launch(&self, spec: &LaunchSpec) -> Result<Vec<IaasNode>, DriverError> {
        debug!(site = %self.site, count = spec.count, "LocalDriver: launch");
        let mut guard = self.nodes.lock().map_err(|_| DriverError::Internal("poisoned lock".into()))?;
        let mut launched = Vec::with_capacity(spec.count);
        for _ in 0..spec.count {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let node = IaasNode {
                id: format!("local-{}-{id}", self.site),
                state: IaasState::Pending,
                public_ip: Some(format!("203.0.113.{}", id % 254 + 1)),
                private_ip: Some(format!("10.0.0.{}", id % 254 + 1)),
                extra: json!({ "image": spec.image, "allocation": spec.allocation }),
            };
            guard.push(node.clone());
            launched.push(node);
        }
        Ok(launched)
    }

    async fn destroy_node(&self, iaas_id: &str) -> Result<(), DriverError> {
        debug!(site = %self.site, iaas_id, "LocalDriver: destroy_node");
        let mut guard = self.nodes.lock().map_err(|_| DriverError::Internal("poisoned lock".into()))?;
        guard.retain(|n| n.id != iaas_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec { count: 2, image: "ami-x".into(), allocation: "small".into(), keyname: None }
    }

    #[tokio::test]
    async fn launch_produces_requested_count() {
        let driver = LocalDriver::new("site-a");
        let nodes = driver.launch(&spec()).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.state == IaasState::Pending));
    }

    #[tokio::test]
    async fn list_nodes_advances_pending_to_running() {
        let driver = LocalDriver::new("site-a");
        driver.launch(&spec()).await.unwrap();
        let nodes = driver.list_nodes().await.unwrap();
        assert!(nodes.iter().all(|n| n.state == IaasState::Running));
    }

    #[tokio::test]
    async fn destroy_node_removes_it_from_listing() {
        let driver = LocalDriver::new("site-a");
        let launched = driver.launch(&spec()).await.unwrap();
        driver.destroy_node(&launched[0].id).await.unwrap();
        let nodes = driver.list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
