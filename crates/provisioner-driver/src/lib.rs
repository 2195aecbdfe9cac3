pub mod driver;
pub mod error;
pub mod local;
pub mod registry;

pub use driver::{Driver, IaasNode, LaunchSpec};
pub use error::DriverError;
pub use local::LocalDriver;
pub use registry::DriverRegistry;
