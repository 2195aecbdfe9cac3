use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration: the site -> driver-endpoint map, the
/// context broker endpoint, and the reconciler's poll cadence.
///
/// The original hard-coded all of this (broker URI, site endpoints);
/// the Design Notes call that out explicitly ("from environment
/// globals to injected configuration"). This is that configuration,
/// loaded once at startup and handed to the constructors of the
/// driver/broker adapters — nothing downstream of this reads the
/// process environment directly.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionerSettings {
    pub sites: HashMap<String, SiteSettings>,
    pub broker: BrokerSettings,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_startup_grace_seconds")]
    pub startup_grace_seconds: i64,
}

/// One IaaS site's endpoint and, optionally, the names of the
/// environment variables its credentials should be read from (e.g.
/// `NIMBUS_KEY`/`NIMBUS_SECRET`, `AWS_ACCESS_KEY_ID`/
/// `AWS_SECRET_ACCESS_KEY`). The variable *names* are configuration;
/// the variable *values* are resolved once, at startup, by
/// [`crate::loader::resolve_credentials`].
#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    pub endpoint: String,
    #[serde(default)]
    pub credentials: Option<CredentialsSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsSettings {
    pub key_env: String,
    pub secret_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    pub endpoint: String,
}

/// Resolved credential values, read once from the process environment
/// at startup and then passed around as plain data — never re-read.
#[derive(Clone)]
pub struct ResolvedCredentials {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials").field("key", &"<redacted>").field("secret", &"<redacted>").finish()
    }
}

fn default_poll_interval_seconds() -> u64 {
    10
}

fn default_startup_grace_seconds() -> i64 {
    60
}
