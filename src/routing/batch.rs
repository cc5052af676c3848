//! Batch orchestrator
//!
//! Fans an ordered list of work items out through one router's gated
//! operation and reports per-item outcomes positionally once every item has
//! settled. A failing item never aborts its siblings.

use futures::future::join_all;

use crate::error::RouterError;
use crate::routing::router::Router;
use crate::work::{Outcome, WorkItem};

/// Run every item through `router`, bounded only by its admission gate.
///
/// Slot `i` of the output always corresponds to `items[i]`, regardless of
/// completion order. Item errors become `Failure` outcomes plus a warning
/// log; only a scaffolding fault (gate teardown, runtime misuse) aborts the
/// whole call. Empty input returns immediately without touching the gate.
pub(crate) async fn run<R: WorkItem>(
    router: &Router<R>,
    items: &[R],
) -> Result<Vec<Outcome>, RouterError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        backend = router.backend(),
        items = items.len(),
        ceiling = router.gate_stats().ceiling,
        "batch started"
    );

    let settled = join_all(items.iter().map(|item| router.run(item))).await;

    let mut outcomes = Vec::with_capacity(settled.len());
    let mut failures = 0usize;
    for (slot, result) in settled.into_iter().enumerate() {
        match result {
            Ok(text) => outcomes.push(Outcome::success(text)),
            Err(err @ (RouterError::Gate(_) | RouterError::Runtime(_))) => return Err(err),
            Err(err) => {
                failures += 1;
                tracing::warn!(
                    backend = router.backend(),
                    slot,
                    error = %err,
                    "batch item failed"
                );
                outcomes.push(Outcome::failure(err.to_string()));
            }
        }
    }

    tracing::info!(
        backend = router.backend(),
        items = outcomes.len(),
        failures,
        "batch settled"
    );
    Ok(outcomes)
}
