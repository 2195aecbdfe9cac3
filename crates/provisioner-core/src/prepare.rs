use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use provisioner_domain::{
    LaunchRecord, LaunchRequest, LaunchState, NodeGroupSummary, NodeRecord, NodeState,
    ProvisioningError,
};
use provisioner_dtrs::DtrsClient;
use provisioner_notifier::Notifier;
use provisioner_store::StateStore;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::notify::store_and_notify;

/// `prepare_provision(request)`.
///
/// Validates the request, consults DTRS, writes the REQUESTED (or
/// FAILED) launch and node records, and returns them for the caller to
/// hand to [`crate::execute::execute_provision`].
///
/// Syntactic validation failures are the *only* thing this function
/// raises synchronously — they mean the request can't even identify
/// its subscribers, so there is nothing safe to persist. Everything
/// past that point (a DTRS lookup failure) is recorded through the
/// normal store-and-notify channel so the controller observes a FAILED
/// state instead of an exception.
pub async fn prepare_provision(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    dtrs: &Arc<dyn DtrsClient>,
    request: LaunchRequest,
) -> Result<(LaunchRecord, Vec<NodeRecord>), CoreError> {
    validate_request(&request)?;

    let now = Utc::now();

    let summaries: HashMap<String, NodeGroupSummary> = request
        .nodes
        .iter()
        .map(|(group_name, group)| {
            (
                group_name.clone(),
                NodeGroupSummary {
                    count: group.ids.len(),
                    site: group.site.clone(),
                    allocation: group.allocation.clone(),
                },
            )
        })
        .collect();

    let lookup = dtrs
        .lookup(&request.deployable_type, &summaries, request.vars.as_ref())
        .await;

    let (launch_state, document, dtrs_nodes, state_desc) = match lookup {
        Ok(result) => (LaunchState::Requested, Some(result.document), Some(result.nodes), None),
        Err(e) => {
            let desc = ProvisioningError::DtrsLookupFailed(e.0).state_desc();
            warn!(launch_id = %request.launch_id, reason = %desc, "DTRS lookup failed");
            (LaunchState::Failed, None, None, Some(desc))
        }
    };

    let mut launch = LaunchRecord::new(
        request.launch_id.clone(),
        request.deployable_type.clone(),
        request.subscribers.clone(),
        launch_state,
    );
    launch.document = document;
    launch.state_desc = state_desc;

    let node_state = match launch_state {
        LaunchState::Requested => NodeState::Requested,
        LaunchState::Failed => NodeState::Failed,
        _ => unreachable!("prepare_provision only produces Requested or Failed launches"),
    };

    let mut nodes = Vec::new();
    for (group_name, group) in &request.nodes {
        let dtrs_fields = dtrs_nodes.as_ref().and_then(|m| m.get(group_name));
        for node_id in &group.ids {
            let mut node = NodeRecord::new(
                provisioner_domain::NodeId::new(node_id.clone()),
                request.launch_id.clone(),
                node_state,
                group.site.clone(),
                group.allocation.clone(),
                group_name.clone(),
                now,
            );
            if let Some(fields) = dtrs_fields {
                node.iaas_allocation = fields.iaas_allocation.clone();
                node.iaas_sshkeyname = fields.iaas_sshkeyname.clone();
            }
            if launch_state == LaunchState::Failed {
                node.state_desc = launch.state_desc.clone();
            }
            nodes.push(node);
        }
    }

    store.put_launch(&launch).await?;
    let nodes = store_and_notify(store, notifier, nodes, &request.subscribers, None).await?;

    info!(
        launch_id = %launch.launch_id,
        state = %launch.state,
        node_count = nodes.len(),
        "prepare_provision complete"
    );

    Ok((launch, nodes))
}

fn validate_request(request: &LaunchRequest) -> Result<(), ProvisioningError> {
    if request.nodes.is_empty() {
        return Err(ProvisioningError::InvalidRequest(
            "nodes must be non-empty".to_string(),
        ));
    }
    for (group_name, group) in &request.nodes {
        if group.ids.is_empty() {
            return Err(ProvisioningError::InvalidRequest(format!(
                "group '{group_name}' has no node ids"
            )));
        }
        if group.site.is_empty() {
            return Err(ProvisioningError::InvalidRequest(format!(
                "group '{group_name}' missing site"
            )));
        }
        if group.allocation.is_empty() {
            return Err(ProvisioningError::InvalidRequest(format!(
                "group '{group_name}' missing allocation"
            )));
        }
    }
    Ok(())
}
