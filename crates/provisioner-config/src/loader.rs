use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::settings::{CredentialsSettings, ProvisionerSettings, ResolvedCredentials};

/// Load and validate a provisioner settings file.
pub fn load_settings(path: &Path) -> Result<ProvisionerSettings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let settings: ProvisionerSettings =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.display().to_string(),
            source: e,
        })?;
    validate(&settings)?;
    debug!(path = %path.display(), sites = settings.sites.len(), "loaded provisioner settings");
    Ok(settings)
}

fn validate(settings: &ProvisionerSettings) -> Result<(), ConfigError> {
    if settings.sites.is_empty() {
        return Err(ConfigError::Invalid(
            "at least one site must be configured".to_string(),
        ));
    }
    if settings.broker.endpoint.is_empty() {
        return Err(ConfigError::Invalid("broker.endpoint must not be empty".to_string()));
    }
    Ok(())
}

/// Read a site's credential values from the process environment, the
/// one place this workspace is allowed to do so — every call site past
/// this is handed the resolved values, never a variable name to look
/// up itself.
pub fn resolve_credentials(
    credentials: &CredentialsSettings,
) -> Result<ResolvedCredentials, ConfigError> {
    let key = std::env::var(&credentials.key_env).map_err(|_| {
        ConfigError::Invalid(format!("environment variable {} is not set", credentials.key_env))
    })?;
    let secret = std::env::var(&credentials.secret_env).map_err(|_| {
        ConfigError::Invalid(format!(
            "environment variable {} is not set",
            credentials.secret_env
        ))
    })?;
    Ok(ResolvedCredentials { key, secret })
}
