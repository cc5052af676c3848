//! Admission gate
//!
//! One counting gate per adapter instance, sized to the backend's effective
//! ceiling. Permits are RAII guards, so a failed or cancelled operation can
//! never leak capacity. Waiters are served in arrival order.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::RouterError;

#[derive(Debug, Default)]
struct GateCounters {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    admitted_total: AtomicU64,
}

/// Point-in-time view of gate activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub ceiling: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub admitted_total: u64,
}

// ============================================================================
// Gate
// ============================================================================

/// Counting gate bounding concurrent operations against one adapter.
///
/// A ceiling of 1 reduces every concurrent request stream to strict
/// sequential execution in gate-arrival order.
#[derive(Debug)]
pub struct AdmissionGate {
    ceiling: usize,
    permits: Arc<Semaphore>,
    counters: Arc<GateCounters>,
}

/// A held admission slot. Capacity returns when this guard drops.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<GateCounters>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionGate {
    /// Create a gate admitting at most `ceiling` concurrent operations.
    /// A zero ceiling is clamped to 1 so the gate can always make progress.
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            ceiling,
            permits: Arc::new(Semaphore::new(ceiling)),
            counters: Arc::new(GateCounters::default()),
        }
    }

    /// Wait for an admission slot; suspends, never busy-waits.
    ///
    /// Fails only if the gate was torn down underneath the waiter, which no
    /// code path in this crate does.
    pub async fn admit(&self) -> Result<AdmissionPermit, RouterError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|err| RouterError::Gate(err.to_string()))?;
        Ok(self.admitted(permit))
    }

    /// Take a slot only if one is free right now.
    pub fn try_admit(&self) -> Option<AdmissionPermit> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| self.admitted(permit))
    }

    fn admitted(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let current = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .peak_in_flight
            .fetch_max(current, Ordering::SeqCst);
        self.counters.admitted_total.fetch_add(1, Ordering::SeqCst);
        AdmissionPermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            ceiling: self.ceiling,
            in_flight: self.counters.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::SeqCst),
            admitted_total: self.counters.admitted_total.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_ceiling_is_clamped() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.ceiling(), 1);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn test_permits_return_on_drop() {
        let gate = AdmissionGate::new(2);

        let first = gate.admit().await.unwrap();
        let second = gate.admit().await.unwrap();
        assert_eq!(gate.available(), 0);
        assert_eq!(gate.in_flight(), 2);
        assert!(gate.try_admit().is_none());

        drop(first);
        assert_eq!(gate.available(), 1);
        assert_eq!(gate.in_flight(), 1);

        drop(second);
        assert_eq!(gate.available(), 2);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_permit_returns_even_when_guarded_work_fails() {
        let gate = AdmissionGate::new(1);

        let failing = async {
            let _permit = gate.admit().await?;
            Err::<(), RouterError>(RouterError::execution("mock", "boom"))
        };
        assert!(failing.await.is_err());

        // capacity came back despite the failure
        assert_eq!(gate.available(), 1);
        assert!(gate.try_admit().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_suspends_until_capacity() {
        let gate = Arc::new(AdmissionGate::new(1));

        let held = gate.admit().await.unwrap();
        let waiter = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move {
                let _permit = gate.admit().await.unwrap();
            }
        });

        // give the waiter time to queue; it must not complete while held
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn test_stats_track_peak_and_total() {
        let gate = AdmissionGate::new(3);

        let a = gate.admit().await.unwrap();
        let b = gate.admit().await.unwrap();
        drop(a);
        let c = gate.admit().await.unwrap();
        drop(b);
        drop(c);

        let stats = gate.stats();
        assert_eq!(stats.ceiling, 3);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.peak_in_flight, 2);
        assert_eq!(stats.admitted_total, 3);
    }
}
