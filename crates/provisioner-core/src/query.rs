use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use provisioner_broker::{ContextBrokerClient, CtxNode};
use provisioner_domain::{
    iaas_state_to_node_state, ordinal_gt, LaunchId, LaunchState, NodeId, NodeRecord, NodeState,
    ProvisioningError,
};
use provisioner_driver::DriverRegistry;
use provisioner_notifier::Notifier;
use provisioner_store::StateStore;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::notify::store_and_notify;

/// A PENDING node missing from IaaS at an age at or below this many
/// seconds is left untouched — it may simply not have propagated to the
/// driver's listing yet. Past this age, its disappearance is terminal.
pub const STARTUP_GRACE_SECONDS: i64 = 60;

/// `query_nodes()` — the periodic control loop. Walks every known site's
/// pre-terminal nodes against that site's driver, then runs the context
/// monitor.
pub async fn query_nodes(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    broker: &Arc<dyn ContextBrokerClient>,
    drivers: &Arc<DriverRegistry>,
) -> Result<(), CoreError> {
    for site in drivers.sites() {
        let nodes = store.get_site_nodes(&site, NodeState::Terminated).await?;
        if let Err(e) = query_one_site(store, notifier, drivers, &site, nodes).await {
            warn!(site = %site, error = %e, "query_one_site failed");
        }
    }
    query_contexts(store, notifier, broker).await?;
    Ok(())
}

pub(crate) fn in_pending_to_pre_terminal_range(state: NodeState) -> bool {
    match state.ordinal() {
        Some(o) => o >= NodeState::Pending.ordinal().unwrap() && o < NodeState::Terminated.ordinal().unwrap(),
        None => false,
    }
}

/// `query_one_site(site, nodes)` (§4.4.1).
async fn query_one_site(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    drivers: &Arc<DriverRegistry>,
    site: &str,
    nodes: Vec<NodeRecord>,
) -> Result<(), CoreError> {
    let driver = match drivers.for_site(site) {
        Ok(d) => d,
        Err(e) => {
            warn!(site, error = %e, "no driver for site during query");
            return Ok(());
        }
    };
    let iaas_nodes = driver.list_nodes().await.map_err(|e| {
        CoreError::Invalid(ProvisioningError::ProgrammerError(format!(
            "list_nodes failed for site {site}: {e}"
        )))
    })?;
    let by_id: HashMap<&str, _> = iaas_nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let now = Utc::now();
    for node in nodes {
        if !in_pending_to_pre_terminal_range(node.state) {
            continue;
        }

        let Some(iaas_id) = node.iaas_id.as_deref() else {
            continue;
        };

        match by_id.get(iaas_id) {
            None => {
                let age = node.age_seconds(now);
                if age <= STARTUP_GRACE_SECONDS {
                    debug!(node_id = %node.node_id, age, "node missing from IaaS, within startup grace window");
                    continue;
                }
                warn!(node_id = %node.node_id, age, "node disappeared from IaaS past startup grace window");
                let mut updated = node.clone();
                updated.state_desc = Some(ProvisioningError::NodeDisappeared.state_desc());
                let subscribers = launch_subscribers(store, &node.launch_id).await?;
                store_and_notify(store, notifier, vec![updated], &subscribers, Some(NodeState::Failed)).await?;
            }
            Some(iaas_node) => {
                let mapped = iaas_state_to_node_state(iaas_node.state);
                if !ordinal_gt(mapped, node.state) {
                    continue;
                }
                let mut updated = node.clone();
                updated.state = mapped;
                updated.public_ip = iaas_node.public_ip.clone();
                updated.private_ip = iaas_node.private_ip.clone();
                let subscribers = launch_subscribers(store, &node.launch_id).await?;
                store_and_notify(store, notifier, vec![updated], &subscribers, None).await?;
            }
        }
    }

    Ok(())
}

async fn launch_subscribers(
    store: &Arc<dyn StateStore>,
    launch_id: &LaunchId,
) -> Result<Vec<provisioner_domain::Subscriber>, CoreError> {
    Ok(store
        .get_launch(launch_id)
        .await?
        .map(|l| l.subscribers)
        .unwrap_or_default())
}

/// `query_contexts()` (§4.4.2).
async fn query_contexts(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    broker: &Arc<dyn ContextBrokerClient>,
) -> Result<(), CoreError> {
    let pending_launches = store.get_launches(Some(LaunchState::Pending)).await?;

    for mut launch in pending_launches {
        let Some(context) = launch.context.clone() else {
            warn!(launch_id = %launch.launch_id, "PENDING launch has no context, skipping");
            continue;
        };

        let status = match broker.query(&context.uri).await {
            Ok(s) => s,
            Err(e) => {
                warn!(launch_id = %launch.launch_id, error = %e, "context broker query failed");
                continue;
            }
        };

        if status.nodes.is_empty() {
            debug!(launch_id = %launch.launch_id, "context has no nodes reporting yet");
            continue;
        }

        let nodes = store.get_launch_nodes(&launch.launch_id).await?;
        let changed = update_nodes_from_context(nodes, &status.nodes);
        if !changed.is_empty() {
            store_and_notify(store, notifier, changed, &launch.subscribers, None).await?;
        }

        if status.complete {
            info!(launch_id = %launch.launch_id, "context complete, launch RUNNING");
            launch.state = LaunchState::Running;
            store.put_launch(&launch).await?;
        } else {
            debug!(
                launch_id = %launch.launch_id,
                reported = status.nodes.len(),
                expected = status.expected_count,
                "context incomplete"
            );
        }
    }

    Ok(())
}

/// `update_nodes_from_context(nodes, ctx_nodes)` (§4.4.3).
///
/// Completion (`ok_occurred`/`error_occurred`) and the error payload are
/// per-ctx_node, not per-identity — a ctx_node can carry several
/// identities but reports one verdict. For each ctx_node, try each
/// identity in turn: a stored node matches on `public_ip == identity.ip`,
/// or (fallback) `public_ip == identity.hostname` ("nimboss IP matches
/// ctx hostname"). First match wins, matching order is the order of
/// `nodes`. The inner identity loop breaks after the first identity
/// whose match actually produces an update — a match that isn't
/// context-done yet, or whose node is already `>= RUNNING`, doesn't
/// break, since no update happened there to stop on.
pub fn update_nodes_from_context(mut nodes: Vec<NodeRecord>, ctx_nodes: &[CtxNode]) -> Vec<NodeRecord> {
    let mut changed_ids: Vec<NodeId> = Vec::new();

    for ctx_node in ctx_nodes {
        let context_done = ctx_node.ok_occurred || ctx_node.error_occurred;

        for identity in &ctx_node.identities {
            let Some(idx) = nodes.iter().position(|n| {
                let Some(ip) = n.public_ip.as_deref() else { return false };
                identity.ip.as_deref() == Some(ip) || identity.hostname.as_deref() == Some(ip)
            }) else {
                debug!("context identity matched no stored node");
                continue;
            };

            let already_advanced = nodes[idx]
                .state
                .ordinal()
                .zip(NodeState::Running.ordinal())
                .map_or(false, |(a, b)| a >= b);

            if !context_done || already_advanced {
                continue;
            }

            if ctx_node.ok_occurred {
                nodes[idx].state = NodeState::Running;
                nodes[idx].pubkey = identity.pubkey.clone();
            } else {
                nodes[idx].state = NodeState::Failed;
                nodes[idx].error_code = ctx_node.error_code.clone();
                nodes[idx].error_message = ctx_node.error_message.clone();
            }
            changed_ids.push(nodes[idx].node_id.clone());
            break;
        }
    }

    nodes
        .into_iter()
        .filter(|n| changed_ids.contains(&n.node_id))
        .collect()
}
