//! Vendor-payload citation extraction (C2), grounded on
//! `backend/app/llm/tool_detection.py`'s payload-walking shapes and
//! `citation_utils.py`'s normalization contract. Dispatches through
//! [`llmgw_core::tool_detection`] rather than re-walking the payload.

use llmgw_core::{Citation, CitationSource, CitationType};
use serde_json::Value;

use crate::domain::etld_plus_one;

fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(etld_plus_one))
        .unwrap_or_default()
}

fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

fn str_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Walk `output[]` (non-streaming) or the streamed event list for
/// `url_citation` annotations (anchored, rank = order of appearance) and
/// bare `tool_result` URLs (unlinked). Mirrors the shapes
/// `detect_openai_websearch_usage` tallies, but produces citations rather
/// than a tool-call count.
#[must_use]
pub fn extract_openai(response: Option<&Value>, stream_events: Option<&[Value]>) -> Vec<Citation> {
    let mut citations = Vec::new();
    let mut rank = 0usize;

    let mut visit_item = |item: &Value, citations: &mut Vec<Citation>, rank: &mut usize| {
        let item_type = str_field(item, "type").unwrap_or("");

        if item_type == "url_citation" {
            if let Some(url) = str_field(item, "url") {
                let mut citation = Citation::new(url, CitationType::Anchored, *rank);
                citation.title = str_field(item, "title").map(str::to_string);
                citation.snippet = str_field(item, "snippet").map(str::to_string);
                citation.source_domain = domain_of(url);
                citation.raw = item.clone();
                citations.push(citation);
                *rank += 1;
            }
            return;
        }

        // Message content parts can carry the same annotation shape nested
        // under `content[].annotations[]`.
        for part in as_list(item.get("content")) {
            for annotation in as_list(part.get("annotations")) {
                if str_field(annotation, "type") != Some("url_citation") {
                    continue;
                }
                let Some(url) = str_field(annotation, "url") else {
                    continue;
                };
                let mut citation = Citation::new(url, CitationType::Anchored, *rank);
                citation.title = str_field(annotation, "title").map(str::to_string);
                citation.snippet = str_field(annotation, "snippet").map(str::to_string);
                citation.source_domain = domain_of(url);
                citation.raw = annotation.clone();
                citations.push(citation);
                *rank += 1;
            }
        }

        if item_type == "tool_result" {
            for result in as_list(item.get("results")).into_iter().chain(as_list(item.get("output"))) {
                let Some(url) = str_field(result, "url").or_else(|| str_field(result, "uri")) else {
                    continue;
                };
                let mut citation = Citation::new(url, CitationType::Unlinked, *rank);
                citation.title = str_field(result, "title").map(str::to_string);
                citation.source_domain = domain_of(url);
                citation.raw = result.clone();
                citations.push(citation);
                *rank += 1;
            }
        }
    };

    if let Some(Value::Object(resp)) = response {
        let output = as_list(resp.get("output"))
            .into_iter()
            .chain(as_list(resp.get("response").and_then(|r| r.get("output"))));
        for item in output {
            visit_item(item, &mut citations, &mut rank);
        }
    }

    if let Some(events) = stream_events {
        for ev in events {
            if let Some(item) = ev.get("item") {
                visit_item(item, &mut citations, &mut rank);
            }
        }
    }

    citations
}

/// Read Gemini/Vertex `grounding_metadata`: `grounding_chunks` supply
/// candidate URLs, `grounding_supports` tie output segments to one or more
/// chunk indices (anchored citations), `web_search_queries` is counted by
/// the caller via [`GroundingSummary::query_count`].
#[derive(Debug, Clone, Default)]
pub struct GroundingSummary {
    pub query_count: u32,
    pub coverage_pct: f64,
}

fn chunk_field<'a>(chunk: &'a Value, key: &str) -> Option<&'a str> {
    chunk
        .get("web")
        .and_then(|w| w.get(key))
        .and_then(Value::as_str)
        .or_else(|| str_field(chunk, key))
}

#[must_use]
pub fn extract_vertex(grounding_metadata: &Value, response_text_len: usize) -> (Vec<Citation>, GroundingSummary) {
    let chunks: Vec<&Value> = as_list(
        grounding_metadata
            .get("grounding_chunks")
            .or_else(|| grounding_metadata.get("groundingChunks")),
    );

    let supports: Vec<&Value> = as_list(
        grounding_metadata
            .get("grounding_supports")
            .or_else(|| grounding_metadata.get("groundingSupports")),
    );

    let query_count = as_list(
        grounding_metadata
            .get("web_search_queries")
            .or_else(|| grounding_metadata.get("webSearchQueries")),
    )
    .len() as u32;

    let mut citations = Vec::new();
    let mut covered_chars = 0usize;

    if supports.is_empty() {
        // No grounding_supports to tie a chunk to an output span: per the
        // unified classification (§4.2), these are unlinked, not anchored.
        for (idx, chunk) in chunks.iter().enumerate() {
            let Some(url) = chunk_field(chunk, "uri").or_else(|| chunk_field(chunk, "url")) else {
                continue;
            };
            let mut citation = Citation::new(url, CitationType::Unlinked, idx);
            citation.title = chunk_field(chunk, "title").map(str::to_string);
            citation.source_domain = domain_of(url);
            citation.raw = (*chunk).clone();
            citations.push(citation);
        }
    } else {
        for (idx, support) in supports.iter().enumerate() {
            let segment = support.get("segment");
            let seg_len = segment
                .and_then(|s| {
                    let start = s.get("start_index").or_else(|| s.get("startIndex")).and_then(Value::as_u64);
                    let end = s.get("end_index").or_else(|| s.get("endIndex")).and_then(Value::as_u64);
                    match (start, end) {
                        (Some(start), Some(end)) => Some(end.saturating_sub(start) as usize),
                        _ => segment
                            .and_then(|s| str_field(s, "text"))
                            .map(str::len),
                    }
                })
                .unwrap_or(0);
            covered_chars += seg_len;

            let indices = as_list(
                support
                    .get("grounding_chunk_indices")
                    .or_else(|| support.get("groundingChunkIndices")),
            );
            for index_val in indices {
                let Some(chunk_idx) = index_val.as_u64().map(|i| i as usize) else {
                    continue;
                };
                let Some(chunk) = chunks.get(chunk_idx) else { continue };
                let Some(url) = chunk_field(chunk, "uri").or_else(|| chunk_field(chunk, "url")) else {
                    continue;
                };
                let mut citation = Citation::new(url, CitationType::Anchored, idx);
                citation.title = chunk_field(chunk, "title").map(str::to_string);
                citation.snippet = segment.and_then(|s| str_field(s, "text")).map(str::to_string);
                citation.source_domain = domain_of(url);
                citation.raw = (*support).clone();
                citations.push(citation);
            }
        }
    }

    let coverage_pct = if response_text_len == 0 {
        0.0
    } else {
        (covered_chars as f64 / response_text_len as f64).min(1.0)
    };

    (
        citations,
        GroundingSummary {
            query_count,
            coverage_pct,
        },
    )
}

/// Apply sibling-field / query-string recovery to every citation's URL,
/// stamping [`Citation::resolved_url`] / [`Citation::resolved_via`] in
/// place. Pure; the HTTP-hop tier is applied by the caller when the
/// `http-resolve` feature and budget allow it.
pub fn apply_resolution(citations: &mut [Citation], resolver: &crate::resolver::Resolver) {
    for citation in citations.iter_mut() {
        match resolver.resolve_citation_url(&citation.url, &citation.raw) {
            crate::resolver::Resolution::SiblingField(url) => {
                citation.resolved_url = Some(url);
                citation.resolved_via = CitationSource::SiblingField;
            }
            crate::resolver::Resolution::QueryString(url) => {
                citation.resolved_url = Some(url);
                citation.resolved_via = CitationSource::QueryString;
            }
            crate::resolver::Resolution::Http(url) => {
                citation.resolved_url = Some(url);
                citation.resolved_via = CitationSource::Http;
            }
            crate::resolver::Resolution::TruncatedByBudget | crate::resolver::Resolution::Unresolved => {}
        }
    }
}

/// Apply the outbound HTTP-hop tier (§4.3) to whatever [`apply_resolution`]
/// left `Unresolved`, honoring the resolver's per-request budget
/// (`max_urls_per_request`, `total_stopwatch`) via [`crate::resolver::Resolver::resolve_batch`].
/// Candidates beyond the budget are stamped `source_type = RedirectOnly`
/// rather than left silently unresolved, matching §4.3's "URLs exceeding
/// budget are marked redirect_only". No-op when `http_resolve_enabled` is
/// false. Call after [`apply_resolution`], before normalization/dedup.
#[cfg(feature = "http-resolve")]
pub async fn apply_http_resolution(
    citations: &mut [Citation],
    resolver: &crate::resolver::Resolver,
    client: &reqwest::Client,
) {
    if !resolver.config().http_resolve_enabled {
        return;
    }

    let start = std::time::Instant::now();
    let pending: Vec<usize> = citations
        .iter()
        .enumerate()
        .filter(|(_, c)| c.resolved_via == CitationSource::Unresolved)
        .map(|(i, _)| i)
        .collect();
    if pending.is_empty() {
        return;
    }

    let candidates: Vec<(String, Value)> = pending
        .iter()
        .map(|&i| (citations[i].url.clone(), citations[i].raw.clone()))
        .collect();
    let decisions = resolver.resolve_batch(&candidates, start.elapsed());

    for (&idx, decision) in pending.iter().zip(decisions.iter()) {
        match decision {
            crate::resolver::Resolution::SiblingField(url) => {
                citations[idx].resolved_url = Some(url.clone());
                citations[idx].resolved_via = CitationSource::SiblingField;
            }
            crate::resolver::Resolution::QueryString(url) => {
                citations[idx].resolved_url = Some(url.clone());
                citations[idx].resolved_via = CitationSource::QueryString;
            }
            crate::resolver::Resolution::Http(url) => {
                citations[idx].resolved_url = Some(url.clone());
                citations[idx].resolved_via = CitationSource::Http;
            }
            crate::resolver::Resolution::TruncatedByBudget => {
                citations[idx].source_type = CitationType::RedirectOnly;
            }
            crate::resolver::Resolution::Unresolved => {
                if start.elapsed() >= resolver.config().total_stopwatch {
                    citations[idx].source_type = CitationType::RedirectOnly;
                    continue;
                }
                let url = citations[idx].url.clone();
                let resolved = crate::resolver::http::resolve_url_with_http(client, resolver.config(), &url).await;
                resolver.cache_put(&url, resolved.clone());
                if let Some(resolved_url) = resolved {
                    citations[idx].resolved_url = Some(resolved_url);
                    citations[idx].resolved_via = CitationSource::Http;
                }
                // else: genuine resolution failure, left Unresolved (not a budget truncation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_url_citation_annotations_in_rank_order() {
        let response = json!({
            "output": [
                {"type": "url_citation", "url": "https://a.test/1", "title": "A"},
                {"type": "url_citation", "url": "https://b.test/2", "title": "B"}
            ]
        });
        let citations = extract_openai(Some(&response), None);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].rank, 0);
        assert_eq!(citations[1].rank, 1);
        assert_eq!(citations[0].source_domain, "a.test");
    }

    #[test]
    fn extracts_nested_content_annotations() {
        let response = json!({
            "output": [{
                "type": "message",
                "content": [{
                    "annotations": [
                        {"type": "url_citation", "url": "https://example.org/p", "title": "Example"}
                    ]
                }]
            }]
        });
        let citations = extract_openai(Some(&response), None);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].source_type, CitationType::Anchored);
    }

    #[test]
    fn tool_result_urls_are_unlinked() {
        let response = json!({
            "output": [{
                "type": "tool_result",
                "results": [{"url": "https://news.test/story"}]
            }]
        });
        let citations = extract_openai(Some(&response), None);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].source_type, CitationType::Unlinked);
    }

    #[test]
    fn no_citations_in_empty_output() {
        let response = json!({"output": []});
        assert!(extract_openai(Some(&response), None).is_empty());
    }

    #[test]
    fn vertex_extracts_from_grounding_chunks_without_supports() {
        let metadata = json!({
            "grounding_chunks": [
                {"web": {"uri": "https://swiss-vat.ch/guide", "title": "Swiss VAT Guide"}}
            ]
        });
        let (citations, summary) = extract_vertex(&metadata, 100);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].url, "https://swiss-vat.ch/guide");
        assert_eq!(citations[0].source_domain, "swiss-vat.ch");
        assert_eq!(citations[0].source_type, CitationType::Unlinked);
        assert_eq!(summary.query_count, 0);
    }

    #[test]
    fn vertex_ties_supports_to_chunk_indices() {
        let metadata = json!({
            "grounding_chunks": [
                {"web": {"uri": "https://a.test/doc", "title": "A"}},
                {"web": {"uri": "https://b.test/doc", "title": "B"}}
            ],
            "grounding_supports": [{
                "segment": {"start_index": 0, "end_index": 20, "text": "some covered text..."},
                "grounding_chunk_indices": [0, 1]
            }],
            "web_search_queries": ["switzerland vat"]
        });
        let (citations, summary) = extract_vertex(&metadata, 100);
        assert_eq!(citations.len(), 2);
        assert_eq!(summary.query_count, 1);
        assert!((summary.coverage_pct - 0.2).abs() < 1e-9);
    }

    #[test]
    fn vertex_coverage_is_zero_for_empty_response_text() {
        let metadata = json!({"grounding_chunks": []});
        let (_, summary) = extract_vertex(&metadata, 0);
        assert_eq!(summary.coverage_pct, 0.0);
    }
}
