//! Rolling 1-minute token-budget gate (§4.5 gate 1). Grounded on the
//! teacher's `parking_lot::Mutex`-guarded per-key state idiom
//! (`acteon-gateway`'s circuit breaker) applied to a token counter instead
//! of a failure streak.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time::sleep;

use crate::config::GovernorConfig;
use crate::error::GovernorError;

const WINDOW: Duration = Duration::from_secs(60);

struct WindowState {
    window_start: Instant,
    tokens_reserved: i64,
    recent_ratios: VecDeque<f64>,
    grounded_multiplier: f64,
}

impl WindowState {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            tokens_reserved: 0,
            recent_ratios: VecDeque::new(),
            grounded_multiplier: 1.0,
        }
    }

    fn roll_if_expired(&mut self, now: Instant) {
        if now.duration_since(self.window_start) >= WINDOW {
            self.window_start = now;
            self.tokens_reserved = 0;
        }
    }
}

pub struct TokenBudget {
    config: GovernorConfig,
    state: Mutex<WindowState>,
}

/// Deterministic jitter in `[min, max)` milliseconds, varying by a
/// monotonic call counter rather than randomness (consistent with the
/// backoff module's jitter idiom).
fn jitter_ms(counter: u64, min_ms: u64, max_ms: u64) -> u64 {
    min_ms + (counter % (max_ms - min_ms + 1))
}

impl TokenBudget {
    #[must_use]
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            state: Mutex::new(WindowState::new(Instant::now())),
            config,
        }
    }

    fn usable_budget(&self) -> f64 {
        f64::from(self.config.tpm_limit) * (1.0 - self.config.headroom_fraction)
    }

    /// Reserve `estimated_tokens` (scaled by the current `grounded_multiplier`
    /// when `grounded`), sleeping to the next minute boundary (plus jitter)
    /// and retrying if the reservation would overflow the window's usable
    /// budget. Returns the token count actually reserved, for later
    /// reconciliation.
    pub async fn reserve(
        &self,
        estimated_tokens: u32,
        grounded: bool,
        deadline: Instant,
    ) -> Result<i64, GovernorError> {
        let mut attempt = 0u64;
        loop {
            let now = Instant::now();
            let (reservation, wait) = {
                let mut state = self.state.lock();
                state.roll_if_expired(now);

                let multiplier = if grounded { state.grounded_multiplier } else { 1.0 };
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let reservation = (f64::from(estimated_tokens) * multiplier).ceil() as i64;

                if (state.tokens_reserved + reservation) as f64 <= self.usable_budget() {
                    state.tokens_reserved += reservation;
                    (Some(reservation), None)
                } else {
                    let remaining_in_window = WINDOW.saturating_sub(now.duration_since(state.window_start));
                    let jitter = Duration::from_millis(jitter_ms(attempt, 500, 750));
                    (None, Some(remaining_in_window + jitter))
                }
            };

            if let Some(reservation) = reservation {
                return Ok(reservation);
            }

            let wait = wait.unwrap_or(Duration::from_millis(500));
            if Instant::now() + wait > deadline {
                return Err(GovernorError::TokenBudgetDeadlineExceeded);
            }
            sleep(wait).await;
            attempt += 1;
        }
    }

    /// Return an unused reservation to the window without recording a
    /// usage sample (called when a request is cancelled before completing).
    pub fn release(&self, reserved: i64) {
        let mut state = self.state.lock();
        state.tokens_reserved -= reserved;
    }

    /// Reconcile a completed request's actual token usage against its
    /// reservation: credits/debits the window and folds
    /// `actual / estimated` into the `grounded_multiplier` sample ring,
    /// clamped to `[1.0, 2.0]` (§4.5 gate 1).
    pub fn reconcile(&self, reserved: i64, actual_tokens: u32, estimated_tokens: u32) {
        let mut state = self.state.lock();
        state.tokens_reserved = (state.tokens_reserved - reserved + i64::from(actual_tokens)).max(0);

        if estimated_tokens > 0 {
            let ratio = f64::from(actual_tokens) / f64::from(estimated_tokens);
            if state.recent_ratios.len() >= self.config.multiplier_sample_window {
                state.recent_ratios.pop_front();
            }
            state.recent_ratios.push_back(ratio);

            let mut sorted: Vec<f64> = state.recent_ratios.iter().copied().collect();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let median = sorted[sorted.len() / 2];
            state.grounded_multiplier = median.clamp(1.0, 2.0);
        }
    }

    #[must_use]
    pub fn grounded_multiplier(&self) -> f64 {
        self.state.lock().grounded_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GovernorConfig {
        GovernorConfig {
            tpm_limit: 1000,
            headroom_fraction: 0.1,
            ..GovernorConfig::default()
        }
    }

    #[tokio::test]
    async fn reserves_within_budget_immediately() {
        let budget = TokenBudget::new(config());
        let deadline = Instant::now() + Duration::from_secs(5);
        let reserved = budget.reserve(500, false, deadline).await.unwrap();
        assert_eq!(reserved, 500);
    }

    #[tokio::test]
    async fn overflow_errors_when_deadline_too_tight() {
        let budget = TokenBudget::new(config());
        let deadline = Instant::now() + Duration::from_millis(10);
        budget.reserve(900, false, deadline).await.unwrap();
        let result = budget.reserve(900, false, deadline).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reconcile_updates_grounded_multiplier_toward_actual_usage() {
        let budget = TokenBudget::new(config());
        let deadline = Instant::now() + Duration::from_secs(5);
        let reserved = budget.reserve(100, true, deadline).await.unwrap();
        budget.reconcile(reserved, 150, 100);
        assert!((budget.grounded_multiplier() - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn multiplier_clamped_to_two() {
        let budget = TokenBudget::new(config());
        let deadline = Instant::now() + Duration::from_secs(5);
        for _ in 0..3 {
            let reserved = budget.reserve(10, true, deadline).await.unwrap();
            budget.reconcile(reserved, 100, 10);
        }
        assert_eq!(budget.grounded_multiplier(), 2.0);
    }

    #[test]
    fn release_credits_back_the_window() {
        let budget = TokenBudget::new(config());
        {
            let mut state = budget.state.lock();
            state.tokens_reserved = 500;
        }
        budget.release(200);
        assert_eq!(budget.state.lock().tokens_reserved, 300);
    }
}
