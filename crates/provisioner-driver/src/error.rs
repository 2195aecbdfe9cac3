use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    #[error("destroy failed: {0}")]
    DestroyFailed(String),

    #[error("internal driver error: {0}")]
    Internal(String),

    #[error("no driver registered for site: {0}")]
    SiteNotConfigured(String),
}
