use std::time::Duration;

use serde::Deserialize;

/// Per-(vendor, model) circuit breaker configuration (§4.6). Deserializable
/// from TOML via `#[serde(default)]`, matching §6's "Configuration
/// (recognized options)" `circuit_failure_threshold`/`circuit_window_s`/
/// `circuit_cooldown_s` fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive transient failures, within `window`, before opening.
    pub failure_threshold: u32,
    /// Window over which consecutive failures are counted; a failure older
    /// than this resets the streak instead of accumulating toward it.
    #[serde(with = "llmgw_core::duration_secs")]
    pub window: Duration,
    /// How long the circuit stays `Open` before allowing a single probe.
    #[serde(with = "llmgw_core::duration_secs")]
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}
