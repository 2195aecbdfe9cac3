use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{LaunchId, Subscriber};

/// One node group within a launch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroupRequest {
    pub ids: Vec<String>,
    pub site: String,
    pub allocation: String,
}

/// A controller's launch request, as handed to `prepare_provision`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub deployable_type: String,
    pub launch_id: LaunchId,
    pub subscribers: Vec<Subscriber>,
    /// group_name -> node group. Must be non-empty.
    pub nodes: HashMap<String, NodeGroupRequest>,
    /// Optional substitution variables for the DTRS template.
    #[serde(default)]
    pub vars: Option<HashMap<String, String>>,
}

/// Per-group summary sent to DTRS: `{count, site, allocation}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroupSummary {
    pub count: usize,
    pub site: String,
    pub allocation: String,
}
