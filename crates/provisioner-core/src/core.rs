use std::sync::Arc;

use provisioner_broker::ContextBrokerClient;
use provisioner_domain::{LaunchId, LaunchRecord, LaunchRequest, NodeId, NodeRecord};
use provisioner_driver::DriverRegistry;
use provisioner_dtrs::DtrsClient;
use provisioner_notifier::Notifier;
use provisioner_store::StateStore;

use crate::error::CoreError;
use crate::{execute, prepare, query, terminate};

/// The request validator, launch/terminate state machine, IaaS-polling
/// reconciler, and contextualization monitor, bundled behind one handle.
///
/// `ProvisionerCore` owns no state itself — every method call goes
/// straight through to the injected [`StateStore`], and nothing is
/// cached in memory across an `.await` point, per the original's
/// "every suspension is a commit boundary" design note. It is cheap to
/// clone (every field is an `Arc`) and safe to call concurrently from
/// multiple tasks.
#[derive(Clone)]
pub struct ProvisionerCore {
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    dtrs: Arc<dyn DtrsClient>,
    broker: Arc<dyn ContextBrokerClient>,
    drivers: Arc<DriverRegistry>,
}

impl ProvisionerCore {
    pub fn new(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        dtrs: Arc<dyn DtrsClient>,
        broker: Arc<dyn ContextBrokerClient>,
        drivers: Arc<DriverRegistry>,
    ) -> Self {
        Self { store, notifier, dtrs, broker, drivers }
    }

    pub async fn prepare_provision(
        &self,
        request: LaunchRequest,
    ) -> Result<(LaunchRecord, Vec<NodeRecord>), CoreError> {
        prepare::prepare_provision(&self.store, &self.notifier, &self.dtrs, request).await
    }

    pub async fn execute_provision(
        &self,
        launch: LaunchRecord,
        nodes: Vec<NodeRecord>,
    ) -> Result<(LaunchRecord, Vec<NodeRecord>), CoreError> {
        execute::execute_provision(
            &self.store,
            &self.notifier,
            &self.broker,
            &self.drivers,
            launch,
            nodes,
        )
        .await
    }

    /// One pass of the periodic control loop: polls every site's driver,
    /// then the context broker.
    pub async fn query_nodes(&self) -> Result<(), CoreError> {
        query::query_nodes(&self.store, &self.notifier, &self.broker, &self.drivers).await
    }

    pub async fn mark_launch_terminating(&self, launch_id: &LaunchId) -> Result<(), CoreError> {
        terminate::mark_launch_terminating(&self.store, &self.notifier, launch_id).await
    }

    pub async fn terminate_launch(&self, launch_id: &LaunchId) -> Result<(), CoreError> {
        terminate::terminate_launch(&self.store, &self.notifier, &self.drivers, launch_id).await
    }

    pub async fn terminate_launches(&self, launch_ids: &[LaunchId]) -> Result<(), CoreError> {
        terminate::terminate_launches(&self.store, &self.notifier, &self.drivers, launch_ids).await
    }

    pub async fn terminate_nodes(&self, node_ids: &[NodeId]) -> Result<(), CoreError> {
        terminate::terminate_nodes(&self.store, &self.notifier, &self.drivers, node_ids).await
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }
}
