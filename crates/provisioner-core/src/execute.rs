use std::collections::HashMap;
use std::sync::Arc;

use provisioner_broker::ContextBrokerClient;
use provisioner_domain::{
    ContextInfo, LaunchRecord, LaunchState, NodeRecord, NodeState, ProvisioningError,
};
use provisioner_driver::{DriverRegistry, LaunchSpec};
use provisioner_notifier::Notifier;
use provisioner_store::{group_records, StateStore};
use tracing::{info, warn};

use crate::document::{ClusterDocument, GroupSpec};
use crate::error::CoreError;
use crate::notify::store_and_notify;

/// `execute_provision(launch, nodes)`.
///
/// Advances a REQUESTED launch to PENDING (contextualization created,
/// groups launched per-site) or FAILED. The original's single outer
/// `try/except` becomes an explicit early-return: any
/// [`ProvisioningError`] surfaced before group launches begin aborts the
/// *whole* launch (§4.3 steps 1, 3, 5). Once group launches start,
/// per-group failures are isolated (§4.3 step 6, §8 "group isolation") —
/// later groups still get a chance, earlier ones keep what they already
/// got from the driver.
///
/// Always returns `Ok` unless the store itself fails; a provisioning
/// failure is a FAILED record, not an `Err` — matching the original's
/// propagation policy that `execute_provision` never raises to its
/// caller once a launch exists.
pub async fn execute_provision(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    broker: &Arc<dyn ContextBrokerClient>,
    drivers: &Arc<DriverRegistry>,
    mut launch: LaunchRecord,
    nodes: Vec<NodeRecord>,
) -> Result<(LaunchRecord, Vec<NodeRecord>), CoreError> {
    match run(store, notifier, broker, drivers, &mut launch, nodes.clone()).await {
        Ok(nodes) => Ok((launch, nodes)),
        Err(e) => {
            let desc = e.state_desc();
            warn!(launch_id = %launch.launch_id, error = %desc, "execute_provision failed, marking launch FAILED");
            launch.state = LaunchState::Failed;
            launch.state_desc = Some(desc.clone());
            store.put_launch(&launch).await?;

            let nodes = store_and_notify(
                store,
                notifier,
                nodes,
                &launch.subscribers,
                Some(NodeState::Failed),
            )
            .await?;
            Ok((launch, nodes))
        }
    }
}

async fn run(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    broker: &Arc<dyn ContextBrokerClient>,
    drivers: &Arc<DriverRegistry>,
    launch: &mut LaunchRecord,
    nodes: Vec<NodeRecord>,
) -> Result<Vec<NodeRecord>, ProvisioningError> {
    let document_text = launch
        .document
        .as_deref()
        .ok_or_else(|| ProvisioningError::ContextDocInvalid("no document on launch".to_string()))?;
    let document = ClusterDocument::parse(document_text)
        .map_err(|e| ProvisioningError::ContextDocInvalid(e.to_string()))?;

    let groups = group_records(nodes, |n: &NodeRecord| n.ctx_name.clone());

    if !document.needs_contextualization {
        return Err(ProvisioningError::NotImplemented(
            "document does not request contextualization".to_string(),
        ));
    }

    let context = broker
        .create()
        .await
        .map_err(|e| ProvisioningError::ContextCreateFailed(e.0))?;
    launch.context = Some(ContextInfo { uri: context.uri.clone() });
    launch.state = LaunchState::Pending;
    store.put_launch(launch).await.map_err(|e| {
        ProvisioningError::ProgrammerError(format!("failed to persist launch: {e}"))
    })?;

    let specs = document.build_specs();
    validate_groups_vs_specs(&groups, specs)?;

    let mut all_nodes: Vec<NodeRecord> = Vec::new();
    for spec in specs {
        let Some(group_nodes) = groups.get(&spec.name) else {
            continue;
        };
        match launch_one_group(drivers, spec, group_nodes.clone()).await {
            Ok(launched) => {
                let launched = store_and_notify(store, notifier, launched, &launch.subscribers, None)
                    .await
                    .map_err(|e| ProvisioningError::ProgrammerError(e.to_string()))?;
                all_nodes.extend(launched);
            }
            Err(e) => {
                warn!(group = %spec.name, error = %e, "group launch failed");
                let failed = store_and_notify(
                    store,
                    notifier,
                    group_nodes.clone(),
                    &launch.subscribers,
                    Some(NodeState::Failed),
                )
                .await
                .map_err(|e| ProvisioningError::ProgrammerError(e.to_string()))?;
                all_nodes.extend(failed);
            }
        }
    }

    Ok(all_nodes)
}

fn validate_groups_vs_specs(
    groups: &HashMap<String, Vec<NodeRecord>>,
    specs: &[GroupSpec],
) -> Result<(), ProvisioningError> {
    if specs.len() != groups.len() {
        return Err(ProvisioningError::InvalidRequest(format!(
            "document declares {} group(s), request has {}",
            specs.len(),
            groups.len()
        )));
    }
    for spec in specs {
        let Some(group_nodes) = groups.get(&spec.name) else {
            return Err(ProvisioningError::InvalidRequest(format!(
                "document spec '{}' has no matching request group",
                spec.name
            )));
        };
        if spec.count != group_nodes.len() {
            return Err(ProvisioningError::InvalidRequest(format!(
                "spec '{}' wants {} node(s), request group has {}",
                spec.name,
                spec.count,
                group_nodes.len()
            )));
        }
    }
    Ok(())
}

/// `_launch_one_group` (§4.3.2). One IaaS request for one node group; a
/// group never spans sites or allocations.
async fn launch_one_group(
    drivers: &Arc<DriverRegistry>,
    spec: &GroupSpec,
    mut nodes: Vec<NodeRecord>,
) -> Result<Vec<NodeRecord>, ProvisioningError> {
    let site = nodes
        .first()
        .map(|n| n.site.clone())
        .ok_or_else(|| ProvisioningError::ProgrammerError("group has no nodes".to_string()))?;
    let driver = drivers
        .for_site(&site)
        .map_err(|e| ProvisioningError::IaasProblem(e.to_string()))?;

    let mut launch_spec = LaunchSpec {
        count: spec.count,
        image: "default".to_string(),
        allocation: spec.size.clone(),
        keyname: spec.keyname.clone(),
    };
    // Per-node overrides win over the document's spec, mirroring the
    // original's "if any node carries iaas_allocation, override spec.size".
    if let Some(allocation) = nodes.iter().find_map(|n| n.iaas_allocation.clone()) {
        launch_spec.allocation = allocation;
    }
    if let Some(keyname) = nodes.iter().find_map(|n| n.iaas_sshkeyname.clone()) {
        launch_spec.keyname = Some(keyname);
    }

    let iaas_nodes = driver
        .launch(&launch_spec)
        .await
        .map_err(|e| ProvisioningError::IaasProblem(e.to_string()))?;

    if iaas_nodes.len() != nodes.len() {
        return Err(ProvisioningError::IaasProblem(format!(
            "requested {} node(s), IaaS returned {}",
            nodes.len(),
            iaas_nodes.len()
        )));
    }

    for (node, iaas_node) in nodes.iter_mut().zip(iaas_nodes.iter()) {
        node.iaas_id = Some(iaas_node.id.clone());
        node.public_ip = iaas_node.public_ip.clone();
        node.private_ip = iaas_node.private_ip.clone();
        node.extra = iaas_node.extra.clone();
        node.state = NodeState::Pending;

        info!(
            event = "new_node",
            public_ip = ?node.public_ip,
            iaas_id = ?node.iaas_id,
            "provisioner new_node event"
        );
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisioner_broker::LocalBroker;
    use provisioner_domain::{LaunchId, LaunchRequest, NodeGroupRequest};
    use provisioner_driver::LocalDriver;
    use provisioner_dtrs::{DtrsClient, StaticDtrsClient};
    use provisioner_notifier::LoggingNotifier;
    use provisioner_store::InMemoryStore;
    use std::collections::HashMap;

    fn single_group_document() -> &'static str {
        r#"{"needs_contextualization": true, "groups": [{"name": "g", "count": 1, "size": "small"}]}"#
    }

    async fn prepared(
        store: &Arc<dyn StateStore>,
        notifier: &Arc<dyn Notifier>,
        site: &str,
    ) -> (LaunchRecord, Vec<NodeRecord>) {
        let dtrs_concrete = StaticDtrsClient::new();
        dtrs_concrete.register("dt", single_group_document(), HashMap::new());
        let dtrs: Arc<dyn DtrsClient> = Arc::new(dtrs_concrete);

        let mut nodes = HashMap::new();
        nodes.insert(
            "g".to_string(),
            NodeGroupRequest { ids: vec!["n1".to_string()], site: site.to_string(), allocation: "small".to_string() },
        );
        let request = LaunchRequest {
            deployable_type: "dt".into(),
            launch_id: LaunchId::new("l1"),
            subscribers: vec![],
            nodes,
            vars: None,
        };
        crate::prepare::prepare_provision(store, notifier, &dtrs, request).await.unwrap()
    }

    #[tokio::test]
    async fn happy_path_advances_to_pending() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier::new());
        let broker: Arc<dyn ContextBrokerClient> = Arc::new(LocalBroker::new());
        let mut registry = DriverRegistry::new();
        registry.register("site-a", Arc::new(LocalDriver::new("site-a")));
        let drivers = Arc::new(registry);

        let (launch, nodes) = prepared(&store, &notifier, "site-a").await;
        let (launch, nodes) = execute_provision(&store, &notifier, &broker, &drivers, launch, nodes)
            .await
            .unwrap();

        assert_eq!(launch.state, LaunchState::Pending);
        assert!(launch.context.is_some());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].state, NodeState::Pending);
        assert!(nodes[0].iaas_id.is_some());
    }

    #[tokio::test]
    async fn unknown_site_fails_the_group_but_not_the_launch() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier::new());
        let broker: Arc<dyn ContextBrokerClient> = Arc::new(LocalBroker::new());
        let drivers = Arc::new(DriverRegistry::new()); // no sites registered

        let (launch, nodes) = prepared(&store, &notifier, "site-missing").await;
        let (launch, nodes) = execute_provision(&store, &notifier, &broker, &drivers, launch, nodes)
            .await
            .unwrap();

        // Launch itself still reaches PENDING: contextualization created fine,
        // only the group's IaaS call failed.
        assert_eq!(launch.state, LaunchState::Pending);
        assert_eq!(nodes[0].state, NodeState::Failed);
    }

    #[tokio::test]
    async fn group_count_mismatch_fails_whole_launch_before_any_iaas_call() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier::new());
        let broker: Arc<dyn ContextBrokerClient> = Arc::new(LocalBroker::new());
        let mut registry = DriverRegistry::new();
        registry.register("site-a", Arc::new(LocalDriver::new("site-a")));
        let drivers = Arc::new(registry);

        let dtrs_concrete = StaticDtrsClient::new();
        // document declares two groups, request only supplies one
        dtrs_concrete.register(
            "dt",
            r#"{"needs_contextualization": true, "groups": [{"name": "a", "count": 1, "size": "small"}, {"name": "b", "count": 1, "size": "small"}]}"#,
            HashMap::new(),
        );
        let dtrs: Arc<dyn DtrsClient> = Arc::new(dtrs_concrete);

        let mut nodes = HashMap::new();
        nodes.insert(
            "a".to_string(),
            NodeGroupRequest { ids: vec!["n1".to_string()], site: "site-a".to_string(), allocation: "small".to_string() },
        );
        let request = LaunchRequest {
            deployable_type: "dt".into(),
            launch_id: LaunchId::new("l1"),
            subscribers: vec![],
            nodes,
            vars: None,
        };
        let (launch, nodes) = crate::prepare::prepare_provision(&store, &notifier, &dtrs, request)
            .await
            .unwrap();

        let (launch, nodes) = execute_provision(&store, &notifier, &broker, &drivers, launch, nodes)
            .await
            .unwrap();

        assert_eq!(launch.state, LaunchState::Failed);
        assert!(launch.state_desc.unwrap().starts_with("INVALID_REQUEST"));
        assert_eq!(nodes[0].state, NodeState::Failed);
    }
}
