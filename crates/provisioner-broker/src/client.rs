use async_trait::async_trait;
use provisioner_domain::ContextInfo;

use crate::error::BrokerError;
use crate::status::ContextStatus;

/// Client for the contextualization broker. One context per launch that
/// needs contextualization; nodes publish identities to it as they come
/// up, and `query` reports which have checked in.
#[async_trait]
pub trait ContextBrokerClient: Send + Sync + 'static {
    async fn create(&self) -> Result<ContextInfo, BrokerError>;

    async fn query(&self, uri: &str) -> Result<ContextStatus, BrokerError>;
}
