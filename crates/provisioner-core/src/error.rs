use thiserror::Error;

use provisioner_domain::ProvisioningError;
use provisioner_store::StoreError;

/// Failures that can escape a `ProvisionerCore` method to its caller.
///
/// Per the original spec's propagation policy (§7), `prepare_provision`
/// is the only entry point that raises synchronously, and only for a
/// request too malformed to persist at all — that case is
/// [`CoreError::Invalid`]. Every other public method (`execute_provision`,
/// `query_nodes`, `terminate_*`) never raises for a provisioning failure;
/// those are recorded as FAILED and notified instead. The one thing that
/// *does* still propagate out of every method is a failure of the store
/// itself — the original's Python had no equivalent for a persistence
/// layer being unreachable, since it assumed the key/value store just
/// worked; this is the one place a re-implementation must be honest
/// about a dependency that can actually fail.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Invalid(#[from] ProvisioningError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
