//! Minimum inter-launch gap gate (§4.5 gate 2): per-vendor `next_slot_epoch`
//! under a `parking_lot::Mutex`, stagger plus bounded jitter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time::sleep;

pub struct LaunchSlot {
    stagger: Duration,
    jitter_max: Duration,
    next_slot: Mutex<Option<Instant>>,
    counter: AtomicU64,
}

impl LaunchSlot {
    #[must_use]
    pub fn new(stagger_seconds: f64) -> Self {
        let jitter_max = Duration::from_secs_f64((0.2 * stagger_seconds).min(3.0));
        Self {
            stagger: Duration::from_secs_f64(stagger_seconds),
            jitter_max,
            next_slot: Mutex::new(None),
            counter: AtomicU64::new(0),
        }
    }

    fn jitter(&self) -> Duration {
        if self.jitter_max.is_zero() {
            return Duration::ZERO;
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let max_millis = self.jitter_max.as_millis().max(1) as u64;
        Duration::from_millis(n % (max_millis + 1))
    }

    /// Block until this caller's launch slot arrives, respecting `deadline`.
    /// Returns the wait actually performed.
    pub async fn wait_for_slot(&self, deadline: Instant) -> Duration {
        let now = Instant::now();
        let target = {
            let mut next_slot = self.next_slot.lock();
            let target = next_slot.map_or(now, |t| t.max(now));
            *next_slot = Some(target + self.stagger + self.jitter());
            target
        };

        if target <= now {
            return Duration::ZERO;
        }

        let wait = (target - now).min(deadline.saturating_duration_since(now));
        if !wait.is_zero() {
            sleep(wait).await;
        }
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_caller_does_not_wait() {
        let gate = LaunchSlot::new(0.05);
        let deadline = Instant::now() + Duration::from_secs(1);
        let wait = gate.wait_for_slot(deadline).await;
        assert!(wait.is_zero());
    }

    #[tokio::test]
    async fn second_caller_waits_at_least_stagger() {
        let gate = LaunchSlot::new(0.05);
        let deadline = Instant::now() + Duration::from_secs(1);
        gate.wait_for_slot(deadline).await;
        let start = Instant::now();
        gate.wait_for_slot(deadline).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn jitter_bounded_by_20_percent_of_stagger_capped_at_3s() {
        let gate = LaunchSlot::new(20.0);
        assert_eq!(gate.jitter_max, Duration::from_secs(3));
        let gate = LaunchSlot::new(1.0);
        assert_eq!(gate.jitter_max, Duration::from_millis(200));
    }
}
