use std::time::Duration;

use llmgw_breaker::CircuitBreakerConfig;
use llmgw_citations::ResolverConfig;
use llmgw_governor::GovernorConfig;
use serde::Deserialize;

/// Scalar tunables shared across every vendor the router dispatches to
/// (§6 "Configuration"). Registrations that vary per vendor — adapters,
/// model-prefix inference, allowlists, failover pairs — live on
/// [`crate::RouterBuilder`] directly, mirroring how the teacher's
/// `GatewayBuilder` separates `executor_config` (tunables) from `rules`/
/// `providers` (registrations). Deserializable from TOML via
/// `#[serde(default)]`, with each nested config deserializing the same way.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub governor: GovernorConfig,
    pub breaker: CircuitBreakerConfig,
    pub resolver: ResolverConfig,
    /// Gates the C8 "Failover" step (§4.8 step 6). Off by default: a
    /// sibling vendor retry is an explicit opt-in, not implied by
    /// registering a failover pair.
    pub failover_enabled: bool,
    /// Fed to the governor's token-budget gate as the pre-call estimate;
    /// reconciled against actual usage once the adapter returns (§4.5).
    pub estimated_tokens_per_request: u32,
    /// Default per-request deadline when the caller does not supply one
    /// via [`crate::Router::complete_with_deadline`].
    #[serde(with = "llmgw_core::duration_secs")]
    pub default_deadline: Duration,
    pub official_domains: Vec<String>,
    pub authority_domains: Vec<String>,
    pub citation_domain_cap: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            governor: GovernorConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            resolver: ResolverConfig::default(),
            failover_enabled: false,
            estimated_tokens_per_request: 1_000,
            default_deadline: Duration::from_secs(30),
            official_domains: Vec::new(),
            authority_domains: Vec::new(),
            citation_domain_cap: 2,
        }
    }
}
