use std::sync::Arc;

use provisioner_domain::{NodeRecord, NodeState, Subscriber};
use provisioner_notifier::Notifier;
use provisioner_store::StateStore;
use tracing::warn;

use crate::error::CoreError;

/// `store_and_notify(records, subscribers, new_state?)` — the one place
/// every observable node state change in the system flows through.
///
/// If `new_state` is given it is stamped onto every record *before* the
/// write, so the persisted state and the notified state can never
/// diverge (the "notify-after-write" testable property in §8). Writes
/// happen first; the notifier is then handed the already-persisted
/// records. A notifier failure is logged and swallowed rather than
/// propagated — the original's notifier is fire-and-forget from the
/// core's point of view, and a dropped notification must never unwind
/// a launch that has already been safely persisted.
pub async fn store_and_notify(
    store: &Arc<dyn StateStore>,
    notifier: &Arc<dyn Notifier>,
    mut records: Vec<NodeRecord>,
    subscribers: &[Subscriber],
    new_state: Option<NodeState>,
) -> Result<Vec<NodeRecord>, CoreError> {
    if let Some(state) = new_state {
        for record in &mut records {
            record.state = state;
        }
    }

    store.put_nodes(&records).await?;

    if let Err(e) = notifier.notify(subscribers, &records).await {
        warn!(error = %e, "notifier delivery failed, continuing");
    }

    Ok(records)
}
