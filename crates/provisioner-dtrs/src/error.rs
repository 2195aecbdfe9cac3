use thiserror::Error;

/// Returned by [`crate::DtrsClient::lookup`] when a deployable type
/// cannot be resolved. The caller (`prepare_provision`) turns this
/// into a `DTRS_LOOKUP_FAILED` failure record rather than propagating
/// it as an exception.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DeployableTypeLookupError(pub String);
