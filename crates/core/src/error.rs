use std::time::Duration;

use thiserror::Error;

/// Errors raised by a vendor adapter while servicing a single `complete` call.
///
/// Variant names mirror the taxonomy in the orchestration design rather than
/// any one vendor's wire error codes; adapters classify whatever the vendor
/// SDK reports into one of these.
#[derive(Debug, Error)]
pub enum VendorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("grounding not supported: {0}")]
    GroundingNotSupported(String),

    #[error("grounding required but no tool call or citation was produced: {why_not_grounded}")]
    GroundingRequiredFailed { why_not_grounded: String },

    #[error("grounding tool invoked but returned zero results")]
    GroundingEmptyResults,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VendorError {
    /// `error_code` as emitted in telemetry (§6 contract: failures must carry
    /// a non-empty `error_code`).
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::GroundingNotSupported(_) => "grounding_not_supported",
            Self::GroundingRequiredFailed { .. } => "grounding_required_failed",
            Self::GroundingEmptyResults => "grounding_empty_results",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Auth(_) => "auth_error",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the adapter's retry loop may reattempt this error with
    /// identical model/message bytes (§4.6 "Retries").
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_) | Self::Timeout(_))
    }

    /// Whether this failure counts toward the circuit breaker's consecutive
    /// failure window (§4.6 "Vendor-specific").
    #[must_use]
    pub fn is_breaker_counting(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_) | Self::Timeout(_))
    }
}

/// Errors raised by the router above the adapter layer.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Vendor(#[from] VendorError),

    #[error("circuit open for {vendor}/{model}")]
    CircuitOpen { vendor: String, model: String },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("als overflow: rendered block is {actual} NFC characters, limit is {limit}")]
    AlsOverflow { actual: usize, limit: usize },

    /// Governor admission did not resolve before the request deadline. Kept
    /// distinct from [`VendorError::Timeout`] because it never reaches the
    /// vendor, so it must not contribute to the breaker's failure window.
    #[error("admission for {vendor} did not resolve before the request deadline")]
    AdmissionTimeout { vendor: String },
}

impl RouterError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Vendor(e) => e.error_code(),
            Self::CircuitOpen { .. } => "circuit_open",
            Self::UnknownModel(_) => "unknown_model",
            Self::AlsOverflow { .. } => "als_overflow",
            Self::AdmissionTimeout { .. } => "admission_timeout",
        }
    }
}
