//! Concurrency gate (§4.5 gate 3): a `tokio::sync::Semaphore` sized to
//! `max_concurrency`, with a timed acquire that proceeds unpermitted
//! (`bypassed = true`) rather than deadlock under a pathological stall,
//! mirroring `acteon-executor::ExecutorConfig::max_concurrent`'s
//! semaphore-cap idiom.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
}

pub enum ConcurrencySlot {
    Permitted(OwnedSemaphorePermit),
    Bypassed,
}

impl ConcurrencySlot {
    #[must_use]
    pub fn bypassed(&self) -> bool {
        matches!(self, Self::Bypassed)
    }
}

impl ConcurrencyGate {
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Wait for a permit until `deadline`; if the deadline passes first,
    /// proceed without one rather than block indefinitely.
    pub async fn acquire_with_timeout(&self, deadline: Instant) -> ConcurrencySlot {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(timeout, Arc::clone(&self.semaphore).acquire_owned()).await {
            Ok(Ok(permit)) => ConcurrencySlot::Permitted(permit),
            Ok(Err(_)) | Err(_) => ConcurrencySlot::Bypassed,
        }
    }

    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn acquires_permit_when_capacity_available() {
        let gate = ConcurrencyGate::new(2);
        let deadline = Instant::now() + Duration::from_secs(1);
        let slot = gate.acquire_with_timeout(deadline).await;
        assert!(!slot.bypassed());
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn bypasses_when_exhausted_past_deadline() {
        let gate = ConcurrencyGate::new(1);
        let deadline = Instant::now() + Duration::from_secs(5);
        let _held = gate.acquire_with_timeout(deadline).await;

        let short_deadline = Instant::now() + Duration::from_millis(10);
        let slot = gate.acquire_with_timeout(short_deadline).await;
        assert!(slot.bypassed());
    }

    #[tokio::test]
    async fn releasing_a_permit_frees_capacity() {
        let gate = ConcurrencyGate::new(1);
        let deadline = Instant::now() + Duration::from_secs(1);
        {
            let _slot = gate.acquire_with_timeout(deadline).await;
            assert_eq!(gate.available_permits(), 0);
        }
        assert_eq!(gate.available_permits(), 1);
    }
}
