use thiserror::Error;

/// Returned by [`crate::ContextBrokerClient`] calls. The core wraps
/// `create` failures into `CONTEXT_CREATE_FAILED`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BrokerError(pub String);
