pub mod client;
pub mod error;
pub mod static_client;

pub use client::{DtrsClient, DtrsLookupResult};
pub use error::DeployableTypeLookupError;
pub use static_client::StaticDtrsClient;
