//! Admission gate — bounds concurrent classification calls.
//!
//! A counted-permit wrapper around a fair semaphore. Waiters queue in
//! arrival order; release happens in [`JobTicket`]'s `Drop`, so every
//! exit path (success, classifier error, cancelled handler) returns its
//! permit.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide classification concurrency limit.
#[derive(Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Permit for one in-flight classification job.
///
/// Owned exclusively by the handling task; dropping it releases the
/// permit exactly once.
pub struct JobTicket {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Build a gate admitting at most `max_concurrent_jobs` jobs.
    /// Values below 1 are clamped to 1.
    pub fn new(max_concurrent_jobs: usize) -> Self {
        let capacity = max_concurrent_jobs.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot. Suspends without timeout; requests beyond
    /// capacity are served first-come-first-served.
    pub async fn admit(&self) -> JobTicket {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("admission gate semaphore is never closed");
        JobTicket { _permit: permit }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently free slots.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn zero_capacity_clamped_to_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.capacity(), 1);
        let _ticket = gate.admit().await;
        assert_eq!(gate.available(), 0);
    }

    #[tokio::test]
    async fn ticket_drop_releases_permit() {
        let gate = AdmissionGate::new(2);
        let ticket = gate.admit().await;
        assert_eq!(gate.available(), 1);
        drop(ticket);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn never_exceeds_capacity_under_load() {
        const MAX: usize = 2;
        const JOBS: usize = 8;

        let gate = AdmissionGate::new(MAX);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..JOBS {
            let gate = gate.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _ticket = gate.admit().await;
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= MAX);
        assert_eq!(gate.available(), MAX);
    }

    #[tokio::test]
    async fn cancelled_waiter_does_not_leak_capacity() {
        let gate = AdmissionGate::new(1);
        let held = gate.admit().await;

        // A waiter parked behind the held permit, then aborted.
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _ticket = gate.admit().await;
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            })
        };
        tokio::task::yield_now().await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        assert_eq!(gate.available(), 1);

        // The gate still admits after the cancellation.
        let _ticket = gate.admit().await;
        assert_eq!(gate.available(), 0);
    }

    #[tokio::test]
    async fn cancelled_holder_returns_permit() {
        let gate = AdmissionGate::new(1);
        let holder = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _ticket = gate.admit().await;
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            })
        };
        // Let the task acquire, then cancel it mid-flight.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        holder.abort();
        let _ = holder.await;

        assert_eq!(gate.available(), 1);
    }
}
