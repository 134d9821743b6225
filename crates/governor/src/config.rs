use serde::Deserialize;

/// Per-vendor governor configuration (§4.5). Deserializable from TOML via
/// `#[serde(default)]`, matching §6's `max_concurrency_per_vendor`/
/// `tpm_limit`/`tpm_headroom_fraction`/`stagger_seconds` options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Tokens-per-minute limit reported by the vendor/plan.
    pub tpm_limit: u32,
    /// Fraction of `tpm_limit` held back as headroom (usable budget is
    /// `tpm_limit * (1 - headroom_fraction)`).
    pub headroom_fraction: f64,
    /// Minimum gap between successive request launches, in seconds.
    pub stagger_seconds: f64,
    /// Maximum number of in-flight requests for this vendor.
    pub max_concurrency: usize,
    /// How many recent actual/estimated ratio samples feed the
    /// `grounded_multiplier` reconciliation.
    pub multiplier_sample_window: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            tpm_limit: 1_000_000,
            headroom_fraction: 0.1,
            stagger_seconds: 0.25,
            max_concurrency: 16,
            multiplier_sample_window: 20,
        }
    }
}
