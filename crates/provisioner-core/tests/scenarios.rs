use std::collections::HashMap;
use std::sync::Arc;

use provisioner_broker::{ContextBrokerClient, CtxIdentity, CtxNode, LocalBroker};
use provisioner_domain::{
    LaunchId, LaunchRequest, LaunchState, NodeGroupRequest, NodeId, NodeState, Subscriber,
};
use provisioner_driver::{Driver, DriverRegistry, LocalDriver};
use provisioner_dtrs::{DtrsClient, StaticDtrsClient};
use provisioner_notifier::{ChannelNotifier, Notifier};
use provisioner_store::{InMemoryStore, StateStore};
use provisioner_core::ProvisionerCore;

fn single_node_document() -> &'static str {
    r#"{"needs_contextualization": true, "groups": [{"name": "g", "count": 1, "size": "small"}]}"#
}

fn request(site: &str) -> LaunchRequest {
    let mut nodes = HashMap::new();
    nodes.insert(
        "g".to_string(),
        NodeGroupRequest { ids: vec!["n1".to_string()], site: site.to_string(), allocation: "small".to_string() },
    );
    LaunchRequest {
        deployable_type: "dt".into(),
        launch_id: LaunchId::new("l1"),
        subscribers: vec![Subscriber::new("sub-a")],
        nodes,
        vars: None,
    }
}

fn build_core(driver: Arc<LocalDriver>, broker: Arc<LocalBroker>) -> (ProvisionerCore, Arc<dyn StateStore>) {
    let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier::new());
    let dtrs_concrete = StaticDtrsClient::new();
    dtrs_concrete.register("dt", single_node_document(), HashMap::new());
    let dtrs: Arc<dyn DtrsClient> = Arc::new(dtrs_concrete);
    let broker: Arc<dyn ContextBrokerClient> = broker;

    let mut registry = DriverRegistry::new();
    registry.register("site-a", driver);
    let drivers = Arc::new(registry);

    (ProvisionerCore::new(store.clone(), notifier, dtrs, broker, drivers), store)
}

/// §8 scenario 1: happy path, single group, single node.
#[tokio::test]
async fn happy_path_single_group_single_node() {
    let driver = Arc::new(LocalDriver::new("site-a"));
    let broker = Arc::new(LocalBroker::new());
    let (core, store) = build_core(driver.clone(), broker.clone());

    let (launch, nodes) = core.prepare_provision(request("site-a")).await.unwrap();
    assert_eq!(launch.state, LaunchState::Requested);
    assert_eq!(nodes[0].state, NodeState::Requested);

    let (launch, nodes) = core.execute_provision(launch, nodes).await.unwrap();
    assert_eq!(launch.state, LaunchState::Pending);
    assert_eq!(nodes[0].state, NodeState::Pending);

    let ctx_uri = launch.context.clone().unwrap().uri;
    broker.set_expected_count(&ctx_uri, 1);

    // list_nodes flips the LocalDriver's synthetic instance from PENDING to RUNNING.
    core.query_nodes().await.unwrap();
    let node = store.get_nodes_by_id(&[NodeId::new("n1")]).await.unwrap().remove(0).unwrap();
    assert_eq!(node.state, NodeState::Started);
    assert!(node.public_ip.is_some());

    // Node reports in to the context broker with a matching public IP.
    broker.report_node(
        &ctx_uri,
        CtxNode {
            identities: vec![CtxIdentity { ip: node.public_ip.clone(), ..Default::default() }],
            ok_occurred: true,
            ..Default::default()
        },
    );

    core.query_nodes().await.unwrap();
    let node = store.get_nodes_by_id(&[NodeId::new("n1")]).await.unwrap().remove(0).unwrap();
    assert_eq!(node.state, NodeState::Running);

    let launch = store.get_launch(&LaunchId::new("l1")).await.unwrap().unwrap();
    assert_eq!(launch.state, LaunchState::Running);
}

/// §8 scenario 5: a PENDING node missing from IaaS at 90s is FAILED;
/// at 30s it is left untouched (the driver never returns it in either
/// case here, standing in for "IaaS forgot about it").
#[tokio::test]
async fn disappeared_node_flips_to_failed_past_grace_window() {
    let driver = Arc::new(LocalDriver::new("site-a"));
    let broker = Arc::new(LocalBroker::new());
    let (core, store) = build_core(driver.clone(), broker.clone());

    let (launch, nodes) = core.prepare_provision(request("site-a")).await.unwrap();
    let (_launch, nodes) = core.execute_provision(launch, nodes).await.unwrap();
    assert_eq!(nodes[0].state, NodeState::Pending);

    // Destroy the node out from under the driver so list_nodes no longer reports it,
    // simulating an instance IaaS has forgotten about.
    let iaas_id = nodes[0].iaas_id.clone().unwrap();
    driver.destroy_node(&iaas_id).await.unwrap();

    // Backdate the node's creation_timestamp past the grace window.
    let mut stale = nodes[0].clone();
    stale.creation_timestamp = chrono::Utc::now() - chrono::Duration::seconds(90);
    store.put_nodes(&[stale]).await.unwrap();

    core.query_nodes().await.unwrap();

    let node = store.get_nodes_by_id(&[NodeId::new("n1")]).await.unwrap().remove(0).unwrap();
    assert_eq!(node.state, NodeState::Failed);
    assert_eq!(node.state_desc.as_deref(), Some("NODE_DISAPPEARED"));
}

/// §8 scenario 6: terminate in mid-lifecycle.
#[tokio::test]
async fn terminate_mid_lifecycle_sets_terminating_then_terminated() {
    let driver = Arc::new(LocalDriver::new("site-a"));
    let broker = Arc::new(LocalBroker::new());
    let (core, store) = build_core(driver, broker);

    let (launch, nodes) = core.prepare_provision(request("site-a")).await.unwrap();
    let (launch, _nodes) = core.execute_provision(launch, nodes).await.unwrap();

    core.mark_launch_terminating(&launch.launch_id).await.unwrap();
    let node = store.get_nodes_by_id(&[NodeId::new("n1")]).await.unwrap().remove(0).unwrap();
    assert_eq!(node.state, NodeState::Terminating);

    core.terminate_launch(&launch.launch_id).await.unwrap();
    let node = store.get_nodes_by_id(&[NodeId::new("n1")]).await.unwrap().remove(0).unwrap();
    assert_eq!(node.state, NodeState::Terminated);
}
