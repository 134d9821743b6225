//! Per-process circuit breaker, grounded on
//! `crates/gateway/src/circuit_breaker.rs`'s `CircuitState`/
//! `CircuitBreaker` shape, simplified to an in-process
//! `DashMap<(VendorId, ModelId), Mutex<CircuitData>>` (§4.6, §5
//! "Shared-resource policy" — no cross-replica `StateStore`/
//! `DistributedLock` for this spec) and a single-probe-success close (no
//! `success_threshold`).

use std::time::{Duration, Instant};

use dashmap::DashMap;
use llmgw_core::{ModelId, VendorId};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::CircuitBreakerConfig;
use crate::error::BreakerError;

/// State of a single vendor/model circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug, Clone)]
struct CircuitData {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Default for CircuitData {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

/// A transition observed by a call into the breaker, for telemetry/logging.
pub type Transition = Option<(CircuitState, CircuitState)>;

/// Per-process circuit breaker keyed by `(vendor, model)` exactly as
/// specified, not just by vendor (§4.6).
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: DashMap<(VendorId, ModelId), Mutex<CircuitData>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: DashMap::new(),
        }
    }

    /// Acquire permission to dispatch a request for `(vendor, model)`.
    ///
    /// Transitions `Open` -> `HalfOpen` once `cooldown` has elapsed, and
    /// allows exactly one in-flight probe in `HalfOpen`; subsequent callers
    /// are rejected until that probe resolves via
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn try_acquire_permit(
        &self,
        vendor: &VendorId,
        model: &ModelId,
    ) -> Result<Transition, BreakerError> {
        let entry = self
            .circuits
            .entry((vendor.clone(), model.clone()))
            .or_default();
        let mut data = entry.lock();

        match data.state {
            CircuitState::Closed => Ok(None),
            CircuitState::Open => {
                let elapsed = data.opened_at.map_or(Duration::MAX, |t| t.elapsed());
                if elapsed >= self.config.cooldown {
                    debug!(%vendor, %model, "circuit transitioning from open to half-open");
                    data.state = CircuitState::HalfOpen;
                    data.probe_in_flight = true;
                    Ok(Some((CircuitState::Open, CircuitState::HalfOpen)))
                } else {
                    Err(BreakerError::Open {
                        vendor: vendor.clone(),
                        model: model.clone(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if data.probe_in_flight {
                    Err(BreakerError::Open {
                        vendor: vendor.clone(),
                        model: model.clone(),
                    })
                } else {
                    data.probe_in_flight = true;
                    Ok(None)
                }
            }
        }
    }

    /// Record a successful execution. A success while `HalfOpen` closes the
    /// circuit immediately (single-probe-success, no `success_threshold`).
    pub fn record_success(&self, vendor: &VendorId, model: &ModelId) -> Transition {
        let entry = self.circuits.entry((vendor.clone(), model.clone())).or_default();
        let mut data = entry.lock();

        match data.state {
            CircuitState::HalfOpen => {
                info!(%vendor, %model, "circuit closing after successful probe");
                data.state = CircuitState::Closed;
                data.consecutive_failures = 0;
                data.probe_in_flight = false;
                Some((CircuitState::HalfOpen, CircuitState::Closed))
            }
            CircuitState::Closed => {
                data.consecutive_failures = 0;
                None
            }
            CircuitState::Open => None,
        }
    }

    /// Record a classified-transient failure. Counts toward
    /// `failure_threshold` only if the last failure was within `window`;
    /// otherwise the streak resets to 1.
    pub fn record_failure(&self, vendor: &VendorId, model: &ModelId) -> Transition {
        let entry = self.circuits.entry((vendor.clone(), model.clone())).or_default();
        let mut data = entry.lock();
        let now = Instant::now();

        match data.state {
            CircuitState::Closed => {
                let within_window = data
                    .last_failure_at
                    .is_some_and(|t| now.duration_since(t) <= self.config.window);
                data.consecutive_failures = if within_window { data.consecutive_failures + 1 } else { 1 };
                data.last_failure_at = Some(now);

                if data.consecutive_failures >= self.config.failure_threshold {
                    info!(
                        %vendor, %model,
                        failures = data.consecutive_failures,
                        threshold = self.config.failure_threshold,
                        "circuit opening"
                    );
                    data.state = CircuitState::Open;
                    data.opened_at = Some(now);
                    Some((CircuitState::Closed, CircuitState::Open))
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                info!(%vendor, %model, "circuit re-opening after failed probe");
                data.state = CircuitState::Open;
                data.opened_at = Some(now);
                data.last_failure_at = Some(now);
                data.probe_in_flight = false;
                Some((CircuitState::HalfOpen, CircuitState::Open))
            }
            CircuitState::Open => {
                data.last_failure_at = Some(now);
                None
            }
        }
    }

    #[must_use]
    pub fn state(&self, vendor: &VendorId, model: &ModelId) -> CircuitState {
        self.circuits
            .get(&(vendor.clone(), model.clone()))
            .map_or(CircuitState::Closed, |e| e.lock().state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (VendorId, ModelId) {
        (VendorId::new("openai"), ModelId::new("gpt-5"))
    }

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            window: Duration::from_secs(60),
            cooldown: Duration::from_millis(20),
        }
    }

    #[test]
    fn starts_closed_and_allows_permits() {
        let (vendor, model) = ids();
        let breaker = CircuitBreaker::new(fast_config());
        assert_eq!(breaker.state(&vendor, &model), CircuitState::Closed);
        assert!(breaker.try_acquire_permit(&vendor, &model).unwrap().is_none());
    }

    #[test]
    fn opens_after_consecutive_failures_reach_threshold() {
        let (vendor, model) = ids();
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure(&vendor, &model);
        breaker.record_failure(&vendor, &model);
        assert_eq!(breaker.state(&vendor, &model), CircuitState::Closed);
        breaker.record_failure(&vendor, &model);
        assert_eq!(breaker.state(&vendor, &model), CircuitState::Open);
    }

    #[test]
    fn open_circuit_rejects_until_cooldown_elapses() {
        let (vendor, model) = ids();
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure(&vendor, &model);
        }
        assert!(breaker.try_acquire_permit(&vendor, &model).is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.try_acquire_permit(&vendor, &model).unwrap().is_some());
        assert_eq!(breaker.state(&vendor, &model), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_closes_on_single_probe_success() {
        let (vendor, model) = ids();
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure(&vendor, &model);
        }
        std::thread::sleep(Duration::from_millis(30));
        breaker.try_acquire_permit(&vendor, &model).unwrap();
        let transition = breaker.record_success(&vendor, &model);
        assert_eq!(transition, Some((CircuitState::HalfOpen, CircuitState::Closed)));
        assert_eq!(breaker.state(&vendor, &model), CircuitState::Closed);
    }

    #[test]
    fn half_open_reopens_on_probe_failure() {
        let (vendor, model) = ids();
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure(&vendor, &model);
        }
        std::thread::sleep(Duration::from_millis(30));
        breaker.try_acquire_permit(&vendor, &model).unwrap();
        breaker.record_failure(&vendor, &model);
        assert_eq!(breaker.state(&vendor, &model), CircuitState::Open);
    }

    #[test]
    fn second_probe_is_rejected_while_one_is_in_flight() {
        let (vendor, model) = ids();
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure(&vendor, &model);
        }
        std::thread::sleep(Duration::from_millis(30));
        breaker.try_acquire_permit(&vendor, &model).unwrap();
        assert!(breaker.try_acquire_permit(&vendor, &model).is_err());
    }

    #[test]
    fn distinct_models_have_independent_circuits() {
        let breaker = CircuitBreaker::new(fast_config());
        let vendor = VendorId::new("openai");
        let model_a = ModelId::new("gpt-5");
        let model_b = ModelId::new("gpt-5-mini");
        for _ in 0..3 {
            breaker.record_failure(&vendor, &model_a);
        }
        assert_eq!(breaker.state(&vendor, &model_a), CircuitState::Open);
        assert_eq!(breaker.state(&vendor, &model_b), CircuitState::Closed);
    }

    #[test]
    fn failure_streak_resets_outside_window() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            window: Duration::from_millis(10),
            cooldown: Duration::from_secs(30),
        });
        let (vendor, model) = ids();
        breaker.record_failure(&vendor, &model);
        breaker.record_failure(&vendor, &model);
        std::thread::sleep(Duration::from_millis(20));
        breaker.record_failure(&vendor, &model);
        assert_eq!(breaker.state(&vendor, &model), CircuitState::Closed);
    }
}
