use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{LaunchId, NodeId, Subscriber};
use crate::states::{LaunchState, NodeState};

/// Context broker handle returned by `ContextBrokerClient::create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub uri: String,
}

/// One submitted launch. Owns N [`NodeRecord`]s (N >= 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub launch_id: LaunchId,
    pub deployable_type: String,
    /// Cluster document text returned by DTRS; absent if lookup failed.
    pub document: Option<String>,
    pub subscribers: Vec<Subscriber>,
    pub state: LaunchState,
    pub state_desc: Option<String>,
    pub context: Option<ContextInfo>,
}

impl LaunchRecord {
    pub fn new(
        launch_id: LaunchId,
        deployable_type: String,
        subscribers: Vec<Subscriber>,
        state: LaunchState,
    ) -> Self {
        Self {
            launch_id,
            deployable_type,
            document: None,
            subscribers,
            state,
            state_desc: None,
            context: None,
        }
    }
}

/// One provisioned (or provisioning) VM, one per node id listed in a
/// launch request's node groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub launch_id: LaunchId,
    pub state: NodeState,
    pub state_desc: Option<String>,

    pub site: String,
    pub allocation: String,
    pub ctx_name: String,

    pub iaas_id: Option<String>,
    pub iaas_allocation: Option<String>,
    pub iaas_sshkeyname: Option<String>,

    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub extra: Value,

    pub pubkey: Option<String>,

    pub error_code: Option<String>,
    pub error_message: Option<String>,

    pub creation_timestamp: DateTime<Utc>,
}

impl NodeRecord {
    pub fn new(
        node_id: NodeId,
        launch_id: LaunchId,
        state: NodeState,
        site: String,
        allocation: String,
        ctx_name: String,
        creation_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id,
            launch_id,
            state,
            state_desc: None,
            site,
            allocation,
            ctx_name,
            iaas_id: None,
            iaas_allocation: None,
            iaas_sshkeyname: None,
            public_ip: None,
            private_ip: None,
            extra: Value::Null,
            pubkey: None,
            error_code: None,
            error_message: None,
            creation_timestamp,
        }
    }

    /// Seconds since this record was created — drives the startup grace
    /// window in the reconciler.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.creation_timestamp).num_seconds().max(0)
    }
}

/// Merge driver-refined per-group IaaS parameters into a node summary
/// built from a launch request. Mirrors the original's
/// `dtrs_nodes[group_name]` blind `.update()` onto the node record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DtrsGroupFields {
    pub iaas_allocation: Option<String>,
    pub iaas_sshkeyname: Option<String>,
    /// Any other opaque fields DTRS chooses to fold in.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}
