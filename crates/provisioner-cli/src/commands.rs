use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use provisioner_broker::{ContextBrokerClient, CtxIdentity, CtxNode, LocalBroker};
use provisioner_core::ProvisionerCore;
use provisioner_domain::{DtrsGroupFields, LaunchId, LaunchRequest, LaunchState, NodeState};
use provisioner_driver::{DriverRegistry, LocalDriver};
use provisioner_dtrs::{DtrsClient, StaticDtrsClient};
use provisioner_notifier::{LoggingNotifier, Notifier};
use provisioner_store::{InMemoryStore, StateStore};
use serde::Deserialize;
use tracing::info;

use crate::output;

/// One entry of a DTRS catalog file: the cluster document text a real
/// DTRS lookup would return for a deployable type, plus the per-group
/// IaaS fields it contributes.
#[derive(Debug, Deserialize)]
struct DtrsCatalogEntry {
    document: String,
    #[serde(default)]
    nodes: HashMap<String, DtrsGroupFields>,
}

/// A fixed deployable-type -> catalog-entry table, loaded once at
/// startup and registered onto a [`StaticDtrsClient`].
type DtrsCatalog = HashMap<String, DtrsCatalogEntry>;

/// The full set of adapters this demo CLI wires [`ProvisionerCore`] to.
/// Built fresh for every invocation: nothing here outlives one run of
/// the binary, so every subcommand replays the pipeline from
/// `prepare_provision` up to whatever stage it needs.
struct Demo {
    core: ProvisionerCore,
    broker: Arc<LocalBroker>,
}

fn load_request(path: &Path) -> Result<LaunchRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading launch request {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing launch request {}", path.display()))
}

fn load_dtrs(path: &Path) -> Result<StaticDtrsClient> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading DTRS catalog {}", path.display()))?;
    let catalog: DtrsCatalog = serde_json::from_str(&text)
        .with_context(|| format!("parsing DTRS catalog {}", path.display()))?;
    let client = StaticDtrsClient::new();
    for (deployable_type, entry) in catalog {
        client.register(deployable_type, entry.document, entry.nodes);
    }
    Ok(client)
}

fn build_demo(config_path: &Path, dtrs_catalog_path: &Path) -> Result<Demo> {
    let settings = provisioner_config::load_settings(config_path)
        .with_context(|| format!("loading settings {}", config_path.display()))?;

    let mut registry = DriverRegistry::new();
    for site in settings.sites.keys() {
        registry.register(site.clone(), Arc::new(LocalDriver::new(site.clone())));
    }

    let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier::new());
    let dtrs: Arc<dyn DtrsClient> = Arc::new(load_dtrs(dtrs_catalog_path)?);
    let broker = Arc::new(LocalBroker::new());
    let broker_trait: Arc<dyn ContextBrokerClient> = broker.clone();

    let core = ProvisionerCore::new(store, notifier, dtrs, broker_trait, Arc::new(registry));
    Ok(Demo { core, broker })
}

/// `provisioner prepare`.
pub async fn prepare(request_path: &Path, dtrs_catalog_path: &Path, config_path: &Path) -> Result<()> {
    let demo = build_demo(config_path, dtrs_catalog_path)?;
    let request = load_request(request_path)?;
    let (launch, nodes) = demo.core.prepare_provision(request).await?;
    println!("{}", output::render_launch(&launch, &nodes));
    Ok(())
}

/// `provisioner execute`.
pub async fn execute(request_path: &Path, dtrs_catalog_path: &Path, config_path: &Path) -> Result<()> {
    let demo = build_demo(config_path, dtrs_catalog_path)?;
    let request = load_request(request_path)?;
    let (launch, nodes) = demo.core.prepare_provision(request).await?;
    let (launch, nodes) = demo.core.execute_provision(launch, nodes).await?;
    println!("{}", output::render_launch(&launch, &nodes));
    Ok(())
}

/// `provisioner reconcile --cycles N`. Runs prepare and execute, then
/// polls `query_nodes` for `cycles` rounds. Between rounds, reports a
/// synthetic context identity for every node that has reached STARTED
/// but not yet RUNNING — standing in for the node itself phoning home
/// to the context broker, which this demo has no real counterpart for.
pub async fn reconcile(
    request_path: &Path,
    dtrs_catalog_path: &Path,
    config_path: &Path,
    cycles: u32,
) -> Result<()> {
    let demo = build_demo(config_path, dtrs_catalog_path)?;
    let request = load_request(request_path)?;
    let (launch, nodes) = demo.core.prepare_provision(request).await?;
    let (launch, _nodes) = demo.core.execute_provision(launch, nodes).await?;

    if let Some(context) = launch.context.as_ref() {
        let expected = demo.core.store().get_launch_nodes(&launch.launch_id).await?.len();
        demo.broker.set_expected_count(&context.uri, expected);
    }

    let mut checked_in = std::collections::HashSet::new();
    for cycle in 1..=cycles {
        demo.core.query_nodes().await?;
        simulate_checkins(&demo, &launch.launch_id, &mut checked_in).await?;
        info!(cycle, "reconcile cycle complete");
    }

    let launch = demo
        .core
        .store()
        .get_launch(&launch.launch_id)
        .await?
        .context("launch vanished from store")?;
    let nodes = demo.core.store().get_launch_nodes(&launch.launch_id).await?;
    println!("{}", output::render_launch(&launch, &nodes));
    Ok(())
}

async fn simulate_checkins(
    demo: &Demo,
    launch_id: &LaunchId,
    checked_in: &mut std::collections::HashSet<String>,
) -> Result<()> {
    let Some(launch) = demo.core.store().get_launch(launch_id).await? else {
        return Ok(());
    };
    let Some(context) = launch.context else {
        return Ok(());
    };
    let nodes = demo.core.store().get_launch_nodes(launch_id).await?;
    for node in nodes {
        if node.state != NodeState::Started {
            continue;
        }
        if !checked_in.insert(node.node_id.as_str().to_string()) {
            continue;
        }
        demo.broker.report_node(
            &context.uri,
            CtxNode {
                identities: vec![CtxIdentity {
                    ip: node.public_ip.clone(),
                    pubkey: Some("ssh-ed25519 AAAA...demo".to_string()),
                    ..Default::default()
                }],
                ok_occurred: true,
                ..Default::default()
            },
        );
    }
    Ok(())
}

/// `provisioner terminate [--mark-only]`. Runs the full pipeline plus a
/// handful of reconcile cycles to get nodes to RUNNING, then tears the
/// launch down.
pub async fn terminate(
    request_path: &Path,
    dtrs_catalog_path: &Path,
    config_path: &Path,
    mark_only: bool,
) -> Result<()> {
    let demo = build_demo(config_path, dtrs_catalog_path)?;
    let request = load_request(request_path)?;
    let (launch, nodes) = demo.core.prepare_provision(request).await?;
    let (launch, _nodes) = demo.core.execute_provision(launch, nodes).await?;

    if launch.state == LaunchState::Pending {
        if let Some(context) = launch.context.as_ref() {
            let expected = demo.core.store().get_launch_nodes(&launch.launch_id).await?.len();
            demo.broker.set_expected_count(&context.uri, expected);
        }
        let mut checked_in = std::collections::HashSet::new();
        for _ in 0..3 {
            demo.core.query_nodes().await?;
            simulate_checkins(&demo, &launch.launch_id, &mut checked_in).await?;
        }
    }

    demo.core.mark_launch_terminating(&launch.launch_id).await?;
    if !mark_only {
        demo.core.terminate_launch(&launch.launch_id).await?;
    }

    let launch = demo
        .core
        .store()
        .get_launch(&launch.launch_id)
        .await?
        .context("launch vanished from store")?;
    let nodes = demo.core.store().get_launch_nodes(&launch.launch_id).await?;
    println!("{}", output::render_launch(&launch, &nodes));
    Ok(())
}
