use super::types::SettleConfig;
use crate::hierarchy::HierarchyScope;
use crate::store::{Store, StoreError, StoreRef};
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Wait until the hierarchy below `target` stops changing.
///
/// Fetches the full subtree every `interval` and returns its descendant count
/// once two consecutive fetches agree. Fails with `StaleSnapshot` when that
/// has not happened within `timeout`.
pub async fn wait_for_settle<S: Store + ?Sized>(
    store: &S,
    target: &StoreRef,
    config: &SettleConfig,
) -> Result<usize, StoreError> {
    let started = Instant::now();
    let mut previous = store
        .fetch_hierarchy(target, HierarchyScope::Subtree)
        .await?
        .descendant_count();

    loop {
        sleep(config.interval).await;

        let current = store
            .fetch_hierarchy(target, HierarchyScope::Subtree)
            .await?
            .descendant_count();

        if current == previous {
            debug!(target = %target.id, nodes = current, "Hierarchy settled");
            return Ok(current);
        }

        if started.elapsed() >= config.timeout {
            return Err(StoreError::StaleSnapshot(format!(
                "{} still changing after {:?} ({} -> {} nodes)",
                target.id, config.timeout, previous, current
            )));
        }

        debug!(target = %target.id, previous, current, "Hierarchy still changing");
        previous = current;
    }
}
