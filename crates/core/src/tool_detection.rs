//! Pure, I/O-free tool-call/grounding detection across the two vendor
//! payload shapes (C4). Shared by the citation extractor (to avoid
//! re-walking the payload) and the vendor adapters (REQUIRED-mode
//! enforcement, §4.7).

use std::collections::HashSet;

use serde_json::Value;

const WEB_TOOL_PREFIXES: &[&str] = &["web_search"];
const WEB_TOOL_NAMES: &[&str] = &["web_search", "web_search_preview"];

const GROUNDING_KEYS: &[&str] = &[
    "grounding_metadata",
    "groundingMetadata",
    "grounding_chunks",
    "groundingChunks",
    "citations",
    "supportingEvidence",
    "supporting_evidence",
    "web_search_results",
    "searchResults",
    "search_results",
    "retrievals",
    "retrieveToolCalls",
    "groundingToolInvocations",
];

const URL_KEYS: &[&str] = &["uri", "url", "link", "sourceUri", "source_url"];

fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Detection result for Provider A (OpenAI-style Responses/Chat).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenAiDetection {
    pub tools_used: bool,
    pub tool_call_count: u32,
    pub observed_kinds: Vec<String>,
}

/// Scan a non-streaming response and/or a streamed event list for web-search
/// tool usage. Mirrors the original `detect_openai_websearch_usage`.
#[must_use]
pub fn detect_openai_websearch_usage(
    response: Option<&Value>,
    stream_events: Option<&[Value]>,
) -> OpenAiDetection {
    let mut tools_used = false;
    let mut call_count = 0u32;
    let mut kinds = Vec::new();

    if let Some(Value::Object(resp)) = response {
        let output = as_list(resp.get("output")).into_iter().chain(as_list(
            resp.get("response").and_then(|r| r.get("output")),
        ));
        for item in output {
            let t = item
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_ascii_lowercase();
            if WEB_TOOL_PREFIXES.iter().any(|pfx| t.starts_with(pfx)) {
                tools_used = true;
                call_count += 1;
                kinds.push(t);
            }
        }

        for choice in as_list(resp.get("choices")) {
            let Some(msg) = choice.get("message") else {
                continue;
            };
            for tc in as_list(msg.get("tool_calls")) {
                let name = tc
                    .get("function")
                    .and_then(|f| f.get("name"))
                    .or_else(|| tc.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if WEB_TOOL_NAMES.contains(&name.as_str()) {
                    tools_used = true;
                    call_count += 1;
                    kinds.push(format!("chat.{name}"));
                }
            }
        }
    }

    if let Some(events) = stream_events {
        for ev in events {
            let etype = ev
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_ascii_lowercase();
            if etype.contains("web_search") {
                tools_used = true;
                call_count += 1;
                kinds.push(etype);
            }

            if let Some(item) = ev.get("item") {
                let t = item
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if WEB_TOOL_PREFIXES.iter().any(|pfx| t.starts_with(pfx)) {
                    tools_used = true;
                    call_count += 1;
                    kinds.push(t);
                }
            }
        }
    }

    OpenAiDetection {
        tools_used,
        tool_call_count: call_count,
        observed_kinds: kinds,
    }
}

fn walk<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(_) => {
            out.push(value);
            if let Value::Object(map) = value {
                for v in map.values() {
                    walk(v, out);
                }
            }
        }
        Value::Array(items) => {
            for v in items {
                walk(v, out);
            }
        }
        _ => {}
    }
}

/// Flatten source URLs out of common Gemini/Vertex shapes: direct
/// `{web: {uri|url}}` nodes and any node carrying one of [`URL_KEYS`].
/// Order-preserving, deduplicated.
#[must_use]
pub fn extract_vertex_sources(payload: &Value) -> Vec<String> {
    let mut nodes = Vec::new();
    walk(payload, &mut nodes);

    let mut urls = Vec::new();
    for node in nodes {
        let Value::Object(obj) = node else { continue };

        if let Some(Value::Object(web)) = obj.get("web") {
            for key in URL_KEYS {
                if let Some(Value::String(s)) = web.get(*key) {
                    urls.push(s.clone());
                }
            }
        }

        for key in URL_KEYS {
            if let Some(Value::String(s)) = obj.get(*key) {
                urls.push(s.clone());
            }
        }
    }

    let mut seen = HashSet::new();
    urls.retain(|u| seen.insert(u.clone()));
    urls
}

/// Detection result for Provider B (Gemini/Vertex grounding).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexDetection {
    pub tools_used: bool,
    pub signal_count: u32,
    pub signals: Vec<String>,
    pub source_urls: Vec<String>,
}

fn scan_grounding_keys(obj: &serde_json::Map<String, Value>) -> Vec<&'static str> {
    GROUNDING_KEYS
        .iter()
        .copied()
        .filter(|k| obj.contains_key(*k))
        .collect()
}

/// Walk a response and/or streamed events for any recognized grounding
/// signal key, at any nesting depth. Mirrors `detect_vertex_grounding_usage`.
#[must_use]
pub fn detect_vertex_grounding_usage(
    response: Option<&Value>,
    stream_events: Option<&[Value]>,
) -> VertexDetection {
    let mut tools_used = false;
    let mut signals = Vec::new();

    if let Some(resp) = response {
        let mut nodes = Vec::new();
        walk(resp, &mut nodes);
        for node in nodes {
            if let Value::Object(obj) = node {
                let hits = scan_grounding_keys(obj);
                if !hits.is_empty() {
                    tools_used = true;
                    signals.extend(hits.iter().map(|s| (*s).to_string()));
                }
            }
        }
    }

    if let Some(events) = stream_events {
        for ev in events {
            let mut nodes = Vec::new();
            walk(ev, &mut nodes);
            for node in nodes {
                if let Value::Object(obj) = node {
                    let hits = scan_grounding_keys(obj);
                    if !hits.is_empty() {
                        tools_used = true;
                        signals.extend(hits.iter().map(|s| (*s).to_string()));
                    }
                }
            }
        }
    }

    let source_urls = response
        .map(extract_vertex_sources)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    signals.retain(|s| seen.insert(s.clone()));

    VertexDetection {
        tools_used,
        signal_count: signals.len() as u32,
        signals,
        source_urls,
    }
}

/// Result of validating the (superseded, §9 Open Question a) two-step
/// grounded-then-reshape-to-JSON contract. Kept only as a test fixture for
/// the detector; production adapters use the single forced-function-call
/// flow instead (see `llmgw-vendor-vertex`).
#[derive(Debug, Clone)]
pub struct AttestationResult {
    pub step1_tools_used: bool,
    pub step1_sources_count: usize,
    pub step1_signals: Vec<String>,
    pub step2_tools_used: bool,
    pub step2_sources_count: usize,
    pub step2_signals: Vec<String>,
    pub contract_ok: bool,
}

#[must_use]
pub fn attest_two_step(
    step1_response: Option<&Value>,
    step1_events: Option<&[Value]>,
    step2_response: Option<&Value>,
    step2_events: Option<&[Value]>,
) -> AttestationResult {
    let s1 = detect_vertex_grounding_usage(step1_response, step1_events);
    let s2 = detect_vertex_grounding_usage(step2_response, step2_events);

    AttestationResult {
        contract_ok: s1.tools_used && !s1.source_urls.is_empty() && !s2.tools_used,
        step1_tools_used: s1.tools_used,
        step1_sources_count: s1.source_urls.len(),
        step1_signals: s1.signals,
        step2_tools_used: s2.tools_used,
        step2_sources_count: s2.source_urls.len(),
        step2_signals: s2.signals,
    }
}

/// Unified detection dispatch used by the router/adapters (§4.4 "Output").
#[derive(Debug, Clone)]
pub enum VendorDetection {
    OpenAi(OpenAiDetection),
    Vertex(VertexDetection),
    Unknown,
}

impl VendorDetection {
    #[must_use]
    pub fn tools_used(&self) -> bool {
        match self {
            Self::OpenAi(d) => d.tools_used,
            Self::Vertex(d) => d.tools_used,
            Self::Unknown => false,
        }
    }

    #[must_use]
    pub fn tool_call_count(&self) -> u32 {
        match self {
            Self::OpenAi(d) => d.tool_call_count,
            Self::Vertex(d) => d.signal_count,
            Self::Unknown => 0,
        }
    }
}

#[must_use]
pub fn normalize_tool_detection(
    vendor: &str,
    response: Option<&Value>,
    stream_events: Option<&[Value]>,
) -> VendorDetection {
    match vendor {
        "openai" => VendorDetection::OpenAi(detect_openai_websearch_usage(response, stream_events)),
        "vertex" => VendorDetection::Vertex(detect_vertex_grounding_usage(response, stream_events)),
        _ => VendorDetection::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_detects_responses_style_web_search_item() {
        let response = json!({
            "output": [
                {"type": "web_search_call", "id": "1"},
                {"type": "message", "content": []}
            ]
        });
        let d = detect_openai_websearch_usage(Some(&response), None);
        assert!(d.tools_used);
        assert_eq!(d.tool_call_count, 1);
        assert_eq!(d.observed_kinds, vec!["web_search_call"]);
    }

    #[test]
    fn openai_falls_back_to_chat_completions_tool_calls() {
        let response = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{"function": {"name": "web_search_preview"}}]
                }
            }]
        });
        let d = detect_openai_websearch_usage(Some(&response), None);
        assert!(d.tools_used);
        assert_eq!(d.tool_call_count, 1);
    }

    #[test]
    fn openai_auto_mode_with_no_tools_detects_nothing() {
        let response = json!({"output": [{"type": "message", "content": []}]});
        let d = detect_openai_websearch_usage(Some(&response), None);
        assert!(!d.tools_used);
        assert_eq!(d.tool_call_count, 0);
    }

    #[test]
    fn vertex_detects_grounding_metadata_at_any_depth() {
        let response = json!({
            "candidates": [{
                "groundingMetadata": {
                    "groundingChunks": [{"web": {"uri": "https://example.org/a"}}]
                }
            }]
        });
        let d = detect_vertex_grounding_usage(Some(&response), None);
        assert!(d.tools_used);
        assert_eq!(d.source_urls, vec!["https://example.org/a"]);
    }

    #[test]
    fn vertex_source_extraction_dedupes_preserving_order() {
        let payload = json!({
            "a": {"web": {"uri": "https://x.test/1"}},
            "b": [{"url": "https://x.test/1"}, {"url": "https://x.test/2"}]
        });
        let urls = extract_vertex_sources(&payload);
        assert_eq!(urls, vec!["https://x.test/1", "https://x.test/2"]);
    }

    #[test]
    fn attest_two_step_contract_ok_when_step2_has_no_grounding() {
        let step1 = json!({"groundingMetadata": {"groundingChunks": [{"web": {"uri": "https://a.test"}}]}});
        let step2 = json!({"output": [{"type": "message"}]});
        let result = attest_two_step(Some(&step1), None, Some(&step2), None);
        assert!(result.contract_ok);
    }

    #[test]
    fn attest_two_step_contract_fails_when_step2_also_grounds() {
        let step1 = json!({"groundingMetadata": {"groundingChunks": [{"web": {"uri": "https://a.test"}}]}});
        let step2 = json!({"groundingMetadata": {"groundingChunks": [{"web": {"uri": "https://b.test"}}]}});
        let result = attest_two_step(Some(&step1), None, Some(&step2), None);
        assert!(!result.contract_ok);
    }

    #[test]
    fn normalize_dispatches_by_vendor_string() {
        let response = json!({"output": [{"type": "web_search_call"}]});
        match normalize_tool_detection("openai", Some(&response), None) {
            VendorDetection::OpenAi(d) => assert!(d.tools_used),
            _ => panic!("expected openai variant"),
        }
        match normalize_tool_detection("unknown_vendor", None, None) {
            VendorDetection::Unknown => {}
            _ => panic!("expected unknown variant"),
        }
    }
}
