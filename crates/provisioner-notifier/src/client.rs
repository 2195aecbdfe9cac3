use async_trait::async_trait;
use provisioner_domain::{NodeRecord, Subscriber};

use crate::error::NotifierError;

/// Delivers node records to named subscribers.
///
/// The original's notifier is fire-and-forget from the core's point of
/// view — `store_and_notify` does not wait for subscriber
/// acknowledgement beyond this trait's own contract, and delivery is
/// at-least-once (idempotent `NodeRecord`s tolerate re-delivery).
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver `nodes` to every address in `subscribers`. A delivery
    /// failure to one subscriber must not be allowed to silently drop
    /// delivery to the others — implementations should attempt all of
    /// them and fold failures into a single `Err` only once every
    /// subscriber has been tried.
    async fn notify(
        &self,
        subscribers: &[Subscriber],
        nodes: &[NodeRecord],
    ) -> Result<(), NotifierError>;
}
