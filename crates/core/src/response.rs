use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a citation's URL was tied to model output (§3 "Citation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationType {
    /// Tied by provider annotation to a specific span of output.
    Anchored,
    /// Present in tool results without a textual anchor.
    Unlinked,
    /// Came from a raw tool-result payload without annotation metadata.
    ToolResult,
    /// A grounding_supports-style citation describing a coverage span.
    EvidenceList,
    /// Resolution was budget-truncated; only the redirector URL survives.
    RedirectOnly,
}

/// Where a citation's URL currently stands relative to resolution (C3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationSource {
    /// Resolved via a sibling field on the same raw payload node.
    SiblingField,
    /// Resolved via query-string decoding of the redirector URL.
    QueryString,
    /// Resolved via an outbound HTTP hop.
    Http,
    /// Not resolved; `resolved_url` is `None`.
    Unresolved,
}

/// A single piece of grounding evidence, normalized across vendors (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub resolved_url: Option<String>,
    pub resolved_via: CitationSource,
    pub source_domain: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub source_type: CitationType,
    pub rank: usize,
    pub raw: serde_json::Value,
}

impl Citation {
    #[must_use]
    pub fn new(url: impl Into<String>, source_type: CitationType, rank: usize) -> Self {
        Self {
            url: url.into(),
            resolved_url: None,
            resolved_via: CitationSource::Unresolved,
            source_domain: String::new(),
            title: None,
            snippet: None,
            source_type,
            rank,
            raw: serde_json::Value::Null,
        }
    }
}

/// Token accounting reported by the vendor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub reasoning_tokens: u32,
    pub total_tokens: u32,
}

/// The `meta` bag a telemetry row nests under (§6 "Telemetry sink").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub response_api: Option<String>,
    pub grounded_effective: bool,
    pub model_adjusted_for_grounding: bool,
    pub original_model: Option<String>,
    pub tool_call_count: u32,
    pub anchored_citations_count: u32,
    pub unlinked_sources_count: u32,
    pub citations_shape_set: Vec<String>,
    pub why_not_grounded: Option<String>,
    pub feature_flags: HashMap<String, bool>,
    pub runtime_flags: HashMap<String, bool>,
    pub ab_bucket: Option<String>,
    pub als_present: bool,
    pub als_country: Option<String>,
    pub als_variant_id: Option<String>,
    pub als_block_sha256: Option<String>,
    pub als_nfc_length: Option<usize>,
    pub vendor_path: Vec<String>,
    pub failover_reason: Option<String>,
    pub temperature_overridden: bool,
    pub requested_temperature: Option<f32>,
    pub final_function_called: Option<bool>,
    pub schema_args_valid: Option<bool>,
}

/// Normalized response returned from `Router::complete` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    pub success: bool,
    pub model_version: String,
    pub vendor: String,
    pub grounded_effective: bool,
    pub usage: Usage,
    pub latency_ms: u64,
    pub citations: Vec<Citation>,
    pub metadata: ResponseMeta,
}
