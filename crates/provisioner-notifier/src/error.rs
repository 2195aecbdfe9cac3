use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("failed to deliver to subscriber {0}: {1}")]
    DeliveryFailed(String, String),
}
