use async_trait::async_trait;
use provisioner_domain::IaasState;
use serde_json::Value;

use crate::error::DriverError;

/// One instance as reported by an IaaS driver's `list_nodes` call.
///
/// Mirrors the fields the original pulled off libcloud's `Node` object
/// (`id`, `state`, `public_ip`, `private_ip`, `extra`).
#[derive(Debug, Clone)]
pub struct IaasNode {
    pub id: String,
    pub state: IaasState,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub extra: Value,
}

/// One node group to launch via a single IaaS request (the original's
/// `NodeSpec`). A launch group never spans sites or allocations.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub count: usize,
    pub image: String,
    pub allocation: String,
    pub keyname: Option<String>,
}

/// Boundary to a single IaaS site. One `Driver` instance is registered
/// per site string in a [`crate::registry::DriverRegistry`].
///
/// Every original call here ran inside `threads.deferToThread` because
/// libcloud is blocking; a real-SDK adapter should do the equivalent
/// with `tokio::task::spawn_blocking`.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Every instance this driver currently knows about at its site.
    async fn list_nodes(&self) -> Result<Vec<IaasNode>, DriverError>;

    /// Launch `spec.count` instances in a single IaaS request. The
    /// returned vec must have exactly `spec.count` entries — a
    /// mismatch is the caller's `IAAS_PROBLEM` case (original
    /// `_launch_one_group`).
    async fn launch(&self, spec: &LaunchSpec) -> Result<Vec<IaasNode>, DriverError>;

    /// Request termination of a single instance by IaaS id.
    async fn destroy_node(&self, iaas_id: &str) -> Result<(), DriverError>;
}
