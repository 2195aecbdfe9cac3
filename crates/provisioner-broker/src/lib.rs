pub mod client;
pub mod error;
pub mod local;
pub mod status;

pub use client::ContextBrokerClient;
pub use error::BrokerError;
pub use local::LocalBroker;
pub use status::{ContextStatus, CtxIdentity, CtxNode};
