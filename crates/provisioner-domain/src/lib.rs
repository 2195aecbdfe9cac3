mod error;
mod ids;
mod records;
mod request;
mod states;

pub use error::ProvisioningError;
pub use ids::{LaunchId, NodeId, Subscriber};
pub use records::{ContextInfo, DtrsGroupFields, LaunchRecord, NodeRecord};
pub use request::{LaunchRequest, NodeGroupRequest, NodeGroupSummary};
pub use states::{iaas_state_to_node_state, ordinal_gt, ordinal_lt, IaasState, LaunchState, NodeState};
