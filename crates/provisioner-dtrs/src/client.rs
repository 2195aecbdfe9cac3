use std::collections::HashMap;

use async_trait::async_trait;
use provisioner_domain::{DtrsGroupFields, NodeGroupSummary};

use crate::error::DeployableTypeLookupError;

/// Result of a successful deployable-type lookup.
pub struct DtrsLookupResult {
    /// Cluster contextualization document text.
    pub document: String,
    /// Per-group IaaS fields DTRS folds into each node record
    /// (`ssh key name`, "real" allocation name, etc.), keyed by the
    /// group name the caller used in its request.
    pub nodes: HashMap<String, DtrsGroupFields>,
}

/// Client for the Deployable Type Registry Service.
///
/// One call, `lookup`, resolves a deployable type name plus a per-group
/// node count/site/allocation summary into a contextualization document
/// and any IaaS-specific fields DTRS wants folded into each node.
#[async_trait]
pub trait DtrsClient: Send + Sync + 'static {
    async fn lookup(
        &self,
        deployable_type: &str,
        nodes: &HashMap<String, NodeGroupSummary>,
        vars: Option<&HashMap<String, String>>,
    ) -> Result<DtrsLookupResult, DeployableTypeLookupError>;
}
