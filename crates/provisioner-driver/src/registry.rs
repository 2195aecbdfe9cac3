use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::Driver;
use crate::error::DriverError;

/// Dispatches driver calls to the correct per-site [`Driver`].
///
/// Mirrors the original's `node_drivers` dict (`{'nimbus-test': ...,
/// 'ec2-east': ...}`): one driver instance per site string, no
/// cloud-target enum — a launch group's site is whatever string the
/// caller's node group request names.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver for a site. Returns `&mut self` for chaining.
    pub fn register(&mut self, site: impl Into<String>, driver: Arc<dyn Driver>) -> &mut Self {
        self.drivers.insert(site.into(), driver);
        self
    }

    pub fn for_site(&self, site: &str) -> Result<Arc<dyn Driver>, DriverError> {
        self.drivers
            .get(site)
            .cloned()
            .ok_or_else(|| DriverError::SiteNotConfigured(site.to_string()))
    }

    /// All sites with a registered driver, used by `query_nodes` to
    /// decide which sites to poll.
    pub fn sites(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }
}
