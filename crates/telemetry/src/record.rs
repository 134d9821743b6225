use chrono::{DateTime, Utc};
use llmgw_core::{RequestId, ResponseMeta};
use serde::{Deserialize, Serialize};

/// One normalized telemetry record per request (§6 "Telemetry sink").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub ts: DateTime<Utc>,
    pub request_id: RequestId,
    pub tenant_id: Option<String>,
    pub vendor: String,
    pub model: String,
    /// The grounding the caller requested, not what actually happened
    /// (`meta.grounded_effective` carries the outcome).
    pub grounded: bool,
    pub json_mode: bool,
    pub latency_ms: u64,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_est_cents: Option<f64>,
    pub success: bool,
    pub error_code: Option<String>,
    pub meta: ResponseMeta,
}
