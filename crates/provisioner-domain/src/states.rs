use serde::{Deserialize, Serialize};

/// A node's lifecycle state.
///
/// Every variant except [`NodeState::ErrorRetrying`] carries a fixed
/// ordinal (see [`NodeState::ordinal`]), preserved at the values the
/// original implementation used (100..700) so `state_desc`/log output
/// lines up with any existing tooling that parses those numbers.
///
/// `ErrorRetrying` intentionally has no ordinal. It is the mapped state
/// for an IaaS-reported `UNKNOWN` condition and the reconciler's
/// "advance only if strictly greater" rule (invariant M) simply never
/// fires for it — see the crate-level note on this in
/// `provisioner-core::query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Requested,
    Failed,
    Pending,
    Started,
    Running,
    Terminating,
    Terminated,
    ErrorRetrying,
}

impl NodeState {
    /// The original implementation's ordinal, or `None` for
    /// `ErrorRetrying`, which was never part of that ordering.
    pub fn ordinal(&self) -> Option<u32> {
        match self {
            NodeState::Requested => Some(100),
            NodeState::Failed => Some(200),
            NodeState::Pending => Some(300),
            NodeState::Started => Some(400),
            NodeState::Running => Some(500),
            NodeState::Terminating => Some(600),
            NodeState::Terminated => Some(700),
            NodeState::ErrorRetrying => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Failed | NodeState::Terminated)
    }
}

/// `a < b` in the original's ordinal sense. `ErrorRetrying` has no
/// ordinal of its own; treated as below every concrete state so a node
/// stuck in it is still picked up by pre-terminal queries like
/// `get_site_nodes`.
pub fn ordinal_lt(a: NodeState, b: NodeState) -> bool {
    match (a.ordinal(), b.ordinal()) {
        (Some(x), Some(y)) => x < y,
        (None, Some(_)) => true,
        (Some(_), None) => false,
        (None, None) => false,
    }
}

/// `a > b` in the original's ordinal sense, used by the reconciler's
/// invariant-M advance check. `ErrorRetrying` is never strictly greater
/// than anything — this reproduces the original's open question/bug
/// where an IaaS-reported `UNKNOWN` silently fails to advance a node,
/// by construction rather than by an arbitrary numeric placement.
pub fn ordinal_gt(a: NodeState, b: NodeState) -> bool {
    match (a.ordinal(), b.ordinal()) {
        (Some(x), Some(y)) => x > y,
        _ => false,
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeState::Requested => "REQUESTED",
            NodeState::Failed => "FAILED",
            NodeState::Pending => "PENDING",
            NodeState::Started => "STARTED",
            NodeState::Running => "RUNNING",
            NodeState::Terminating => "TERMINATING",
            NodeState::Terminated => "TERMINATED",
            NodeState::ErrorRetrying => "ERROR_RETRYING",
        };
        write!(f, "{}", s)
    }
}

/// A launch's lifecycle state — a coarser vocabulary than [`NodeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchState {
    Requested,
    Pending,
    Running,
    Failed,
}

impl std::fmt::Display for LaunchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LaunchState::Requested => "REQUESTED",
            LaunchState::Pending => "PENDING",
            LaunchState::Running => "RUNNING",
            LaunchState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// The state an IaaS driver reports for one instance, prior to mapping
/// through [`iaas_state_to_node_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IaasState {
    Running,
    Rebooting,
    Pending,
    Terminated,
    Unknown,
}

/// The IaaS-state → node-state map, reproduced verbatim from the
/// original's `_NIMBOSS_STATE_MAP`, `UNKNOWN` included — it is mapped to
/// `ErrorRetrying`, which has no ordinal and is therefore silently
/// skipped by the reconciler's strictly-greater advance check. This is
/// flagged as an open question in the design notes, not "fixed" here.
pub fn iaas_state_to_node_state(state: IaasState) -> NodeState {
    match state {
        IaasState::Running => NodeState::Started,
        IaasState::Rebooting => NodeState::Started,
        IaasState::Pending => NodeState::Pending,
        IaasState::Terminated => NodeState::Terminated,
        IaasState::Unknown => NodeState::ErrorRetrying,
    }
}
