use std::sync::Arc;

use provisioner_domain::{LaunchId, NodeId, NodeRecord, NodeState};
use provisioner_driver::DriverRegistry;
use provisioner_notifier::Notifier;
use provisioner_store::StateStore;
use tracing::warn;

use crate::error::CoreError;
use crate::notify::store_and_notify;
use crate::query::in_pending_to_pre_terminal_range;

/// `mark_launch_terminating(launch_id)`. A "committed-intent" marker —
/// every non-terminal node of the launch moves to TERMINATING without
/// any IaaS call. Per the original's open question, callers that skip
/// this and go straight to [`terminate_launch`] never observe
/// TERMINATING at all; that is allowed, not a bug this layer corrects.
pub async fn mark_launch_terminating(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    launch_id: &LaunchId,
) -> Result<(), CoreError> {
    let Some(launch) = store.get_launch(launch_id).await? else {
        warn!(launch_id = %launch_id, "mark_launch_terminating: unknown launch");
        return Ok(());
    };
    let nodes = store.get_launch_nodes(launch_id).await?;
    let non_terminal: Vec<NodeRecord> = nodes.into_iter().filter(|n| !n.state.is_terminal()).collect();
    if non_terminal.is_empty() {
        return Ok(());
    }
    store_and_notify(
        store,
        notifier,
        non_terminal,
        &launch.subscribers,
        Some(NodeState::Terminating),
    )
    .await?;
    Ok(())
}

/// `terminate_launch(launch_id)`. Destroys every node of the launch that
/// is at or past PENDING and not yet TERMINATED.
pub async fn terminate_launch(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    drivers: &Arc<DriverRegistry>,
    launch_id: &LaunchId,
) -> Result<(), CoreError> {
    let Some(launch) = store.get_launch(launch_id).await? else {
        warn!(launch_id = %launch_id, "terminate_launch: unknown launch");
        return Ok(());
    };
    let nodes = store.get_launch_nodes(launch_id).await?;
    for node in nodes {
        if !in_pending_to_pre_terminal_range(node.state) {
            continue;
        }
        terminate_node(store, notifier, drivers, node, &launch.subscribers).await?;
    }
    Ok(())
}

/// `terminate_launches(ids)` — sequential over [`terminate_launch`].
pub async fn terminate_launches(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    drivers: &Arc<DriverRegistry>,
    launch_ids: &[LaunchId],
) -> Result<(), CoreError> {
    for launch_id in launch_ids {
        terminate_launch(store, notifier, drivers, launch_id).await?;
    }
    Ok(())
}

/// `terminate_nodes(ids)`. Unknown ids are warned about and skipped;
/// every surviving node is destroyed, fetching its own launch for the
/// subscriber list.
pub async fn terminate_nodes(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    drivers: &Arc<DriverRegistry>,
    node_ids: &[NodeId],
) -> Result<(), CoreError> {
    let maybe_nodes = store.get_nodes_by_id(node_ids).await?;
    for (id, maybe_node) in node_ids.iter().zip(maybe_nodes.into_iter()) {
        let Some(node) = maybe_node else {
            warn!(node_id = %id, "terminate_nodes: unknown node id");
            continue;
        };
        let subscribers = store
            .get_launch(&node.launch_id)
            .await?
            .map(|l| l.subscribers)
            .unwrap_or_default();
        terminate_node(store, notifier, drivers, node, &subscribers).await?;
    }
    Ok(())
}

/// `_terminate_node(node, launch)`. Synthesizes just enough of an IaaS
/// handle (the `iaas_id`) to ask the node's driver to destroy it, then
/// stamps TERMINATED.
async fn terminate_node(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    drivers: &Arc<DriverRegistry>,
    node: NodeRecord,
    subscribers: &[provisioner_domain::Subscriber],
) -> Result<(), CoreError> {
    if let Some(iaas_id) = node.iaas_id.as_deref() {
        match drivers.for_site(&node.site) {
            Ok(driver) => {
                if let Err(e) = driver.destroy_node(iaas_id).await {
                    warn!(node_id = %node.node_id, error = %e, "destroy_node failed, still marking TERMINATED");
                }
            }
            Err(e) => {
                warn!(node_id = %node.node_id, error = %e, "no driver for node's site during terminate");
            }
        }
    }

    store_and_notify(store, notifier, vec![node], subscribers, Some(NodeState::Terminated)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use provisioner_domain::{LaunchRecord, LaunchState};
    use provisioner_driver::LocalDriver;
    use provisioner_notifier::LoggingNotifier;
    use provisioner_store::InMemoryStore;

    async fn setup() -> (Arc<dyn StateStore>, Arc<dyn Notifier>, Arc<DriverRegistry>) {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier::new());
        let mut registry = DriverRegistry::new();
        registry.register("site-a", Arc::new(LocalDriver::new("site-a")));
        (store, notifier, Arc::new(registry))
    }

    async fn seed_launch(store: &Arc<dyn StateStore>, state: NodeState) {
        let launch = LaunchRecord::new(LaunchId::new("l1"), "dt".into(), vec![], LaunchState::Pending);
        store.put_launch(&launch).await.unwrap();
        let node = NodeRecord::new(
            NodeId::new("n1"),
            LaunchId::new("l1"),
            state,
            "site-a".into(),
            "small".into(),
            "g".into(),
            Utc::now(),
        );
        store.put_nodes(&[node]).await.unwrap();
    }

    #[tokio::test]
    async fn mark_terminating_does_not_call_driver() {
        let (store, notifier, _drivers) = setup().await;
        seed_launch(&store, NodeState::Started).await;

        mark_launch_terminating(&store, &notifier, &LaunchId::new("l1")).await.unwrap();

        let nodes = store.get_launch_nodes(&LaunchId::new("l1")).await.unwrap();
        assert_eq!(nodes[0].state, NodeState::Terminating);
    }

    #[tokio::test]
    async fn terminate_launch_marks_terminated() {
        let (store, notifier, drivers) = setup().await;
        seed_launch(&store, NodeState::Started).await;

        terminate_launch(&store, &notifier, &drivers, &LaunchId::new("l1")).await.unwrap();

        let nodes = store.get_launch_nodes(&LaunchId::new("l1")).await.unwrap();
        assert_eq!(nodes[0].state, NodeState::Terminated);
    }

    #[tokio::test]
    async fn terminate_nodes_skips_unknown_ids() {
        let (store, notifier, drivers) = setup().await;
        seed_launch(&store, NodeState::Started).await;

        terminate_nodes(&store, &notifier, &drivers, &[NodeId::new("n1"), NodeId::new("missing")])
            .await
            .unwrap();

        let nodes = store.get_launch_nodes(&LaunchId::new("l1")).await.unwrap();
        assert_eq!(nodes[0].state, NodeState::Terminated);
    }
}
