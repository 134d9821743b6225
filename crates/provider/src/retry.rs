//! Exponential backoff with deterministic jitter for adapter-local retries
//! (§4.6 "Retries"). Ported from `acteon-executor::retry::RetryStrategy`,
//! narrowed to the single exponential curve the spec requires: 0.5s, 1s,
//! 2s, 4s, each jittered by ±20%.

use std::time::Duration;

/// Up to 4 attempts total (1 initial + 3 retries), only on errors the
/// vendor adapter classifies as transient via
/// [`llmgw_core::VendorError::is_retryable`].
pub const MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base: Duration,
    max: Duration,
    multiplier: f64,
    jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(4),
            multiplier: 2.0,
            jitter_fraction: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry attempt `attempt` (0-based: the delay before the
    /// *first* retry, i.e. after the initial attempt fails, is
    /// `delay_for(0)`). `jitter_seed` varies the jitter deterministically
    /// across attempts without requiring an RNG, mirroring the teacher's
    /// `1.0 + 0.1*(attempt % 5)` formula.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_wrap)]
        let raw = self.base.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let jitter_factor = 1.0 - self.jitter_fraction + (2.0 * self.jitter_fraction) * jitter_phase(attempt);
        let jittered = raw * jitter_factor;
        Duration::from_secs_f64(jittered.min(self.max.as_secs_f64()))
    }
}

/// Deterministic value in `[0, 1)` varying by attempt, standing in for
/// randomness so retries stay reproducible in tests while still spreading
/// concurrent callers across the jitter window.
fn jitter_phase(attempt: u32) -> f64 {
    f64::from(attempt % 5) / 5.0
}

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping between attempts per
/// `policy`, stopping as soon as `op` succeeds or returns a non-retryable
/// error. The model name and message bytes passed into `op` are fixed by
/// the caller's closure capture, preserving prompt immutability across
/// attempts.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < MAX_ATTEMPTS && is_retryable(&err) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, ?delay, "retrying transient vendor error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_before_jitter_clamp() {
        let policy = RetryPolicy {
            jitter_fraction: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let policy = RetryPolicy::default();
        let base = 0.5;
        let d = policy.delay_for(0).as_secs_f64();
        assert!(d >= base * 0.8 - 1e-9 && d <= base * 1.2 + 1e-9);
    }

    #[tokio::test]
    async fn stops_retrying_on_non_retryable_error() {
        let mut calls = 0;
        let result: Result<(), &str> = retry_with_backoff(
            RetryPolicy {
                base: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
            |_| false,
            |_attempt| {
                calls += 1;
                async { Err("permanent") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn exhausts_max_attempts_on_persistent_transient_error() {
        let mut calls = 0;
        let result: Result<(), &str> = retry_with_backoff(
            RetryPolicy {
                base: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
            |_| true,
            |_attempt| {
                calls += 1;
                async { Err("transient") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls, MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn succeeds_after_one_retry() {
        let mut calls = 0;
        let result = retry_with_backoff(
            RetryPolicy {
                base: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
            |_: &&str| true,
            |attempt| {
                calls += 1;
                async move { if attempt == 0 { Err("transient") } else { Ok(42) } }
            },
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 2);
    }
}
