use std::time::Instant;

use llmgw_core::{CitationType, GroundingMode, Request, Response, ResponseMeta, Usage, VendorError};
use llmgw_provider::{retry_with_backoff, RetryPolicy};
use serde_json::{json, Value};

use crate::config::OpenAiConfig;

fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

fn role_str(role: llmgw_core::Role) -> &'static str {
    match role {
        llmgw_core::Role::System => "system",
        llmgw_core::Role::User => "user",
        llmgw_core::Role::Assistant => "assistant",
    }
}

fn classify_transport_error(err: reqwest::Error) -> VendorError {
    if err.is_timeout() {
        VendorError::Timeout(std::time::Duration::from_secs(err.status().map_or(30, |_| 30)))
    } else {
        VendorError::UpstreamUnavailable(err.to_string())
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> VendorError {
    match status.as_u16() {
        401 | 403 => VendorError::Auth(body.to_string()),
        429 => VendorError::QuotaExceeded(body.to_string()),
        400 | 422 => VendorError::Validation(body.to_string()),
        500..=599 => VendorError::UpstreamUnavailable(format!("HTTP {status}: {body}")),
        _ => VendorError::Internal(format!("HTTP {status}: {body}")),
    }
}

fn is_tool_type_unsupported(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("tool") && (lower.contains("unsupported") || lower.contains("not supported") || lower.contains("invalid type"))
}

/// Provider A ("Responses"-style) adapter. Grounded on `openai_adapter.py`'s
/// structure (health-gate-once, allowlist validation, tool declaration,
/// streaming-vs-buffered branch) and `crates/llm/src/http.rs`'s
/// `reqwest::Client` + bearer-auth + JSON-body idiom, corrected to use the
/// Responses endpoint for both grounded and ungrounded calls (§4.7 "Shape
/// conversion").
#[derive(Debug)]
pub struct OpenAiAdapter {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiAdapter {
    pub fn new(config: OpenAiConfig) -> Result<Self, VendorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VendorError::Internal(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn resolve_model(&self, request: &Request) -> (String, ResponseMeta) {
        let mut meta = ResponseMeta::default();
        let mut model = request.model.as_str().to_string();
        if request.grounded {
            if let Some(grounded) = self.config.model_adjust_for_grounding.get(&model) {
                meta.model_adjusted_for_grounding = true;
                meta.original_model = Some(model.clone());
                model = grounded.clone();
            }
        }
        (model, meta)
    }

    fn build_body(&self, request: &Request, model: &str, tool_name: &str, temperature: Option<f32>, json_envelope: bool) -> Value {
        let input: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({"role": role_str(m.role), "content": m.content.as_ref()}))
            .collect();

        let mut body = json!({"model": model, "input": input});
        if let Some(t) = temperature {
            body["temperature"] = json!(t);
        }
        if let Some(max) = request.max_tokens {
            body["max_output_tokens"] = json!(max);
        }
        if request.grounded {
            body["tools"] = json!([{"type": tool_name}]);
        }
        if json_envelope {
            body["text"] = json!({"format": {
                "type": "json_schema",
                "name": "envelope",
                "schema": {
                    "type": "object",
                    "properties": {"content": {"type": "string"}},
                    "required": ["content"],
                },
            }});
        } else if request.json_mode {
            let format = request.json_schema.clone().map_or_else(
                || json!({"type": "json_object"}),
                |schema| json!({"type": "json_schema", "name": "response", "schema": schema}),
            );
            body["text"] = json!({"format": format});
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<Value, VendorError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }
        response.json::<Value>().await.map_err(|e| VendorError::Internal(e.to_string()))
    }

    async fn call_with_retry(&self, body_fn: impl Fn() -> Value) -> Result<Value, VendorError> {
        retry_with_backoff(RetryPolicy::default(), VendorError::is_retryable, |_attempt| {
            let body = body_fn();
            async move { self.send(&body).await }
        })
        .await
    }

    fn extract_text(response: &Value) -> String {
        let mut text = String::new();
        for item in as_list(response.get("output")) {
            if item.get("type").and_then(Value::as_str) != Some("message") {
                continue;
            }
            for part in as_list(item.get("content")) {
                if let Some(t) = part.get("text").and_then(Value::as_str) {
                    text.push_str(t);
                }
            }
        }
        text
    }

    fn extract_envelope_text(response: &Value) -> Option<String> {
        let raw = Self::extract_text(response);
        serde_json::from_str::<Value>(raw.trim())
            .ok()
            .and_then(|v| v.get("content").and_then(Value::as_str).map(str::to_string))
    }

    fn parse_usage(response: &Value) -> Usage {
        let usage = response.get("usage");
        let field = |key: &str| usage.and_then(|u| u.get(key)).and_then(Value::as_u64).unwrap_or(0) as u32;
        Usage {
            prompt_tokens: field("input_tokens"),
            completion_tokens: field("output_tokens"),
            reasoning_tokens: field("reasoning_tokens"),
            total_tokens: field("total_tokens"),
        }
    }
}

impl llmgw_provider::Adapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &Request) -> Result<Response, VendorError> {
        let (model, mut meta) = self.resolve_model(request);

        let temperature = if request.grounded {
            if let Some(fixed) = self.config.grounded_temperature {
                meta.temperature_overridden = true;
                meta.requested_temperature = request.temperature;
                Some(fixed)
            } else {
                request.temperature
            }
        } else {
            request.temperature
        };

        let start = Instant::now();
        let mut tool_name = "web_search";

        let mut raw = self
            .call_with_retry(|| self.build_body(request, &model, tool_name, temperature, false))
            .await;

        if request.grounded {
            if let Err(VendorError::Validation(message)) = &raw {
                if is_tool_type_unsupported(message) {
                    tool_name = "web_search_preview";
                    meta.runtime_flags.insert("web_search_preview_used".into(), true);
                    raw = self
                        .call_with_retry(|| self.build_body(request, &model, tool_name, temperature, false))
                        .await;
                }
            }
        }

        let mut raw = raw?;
        let mut text = Self::extract_text(&raw);

        if text.is_empty() && !request.grounded && self.config.ungrounded_json_envelope_fallback {
            raw = self
                .call_with_retry(|| self.build_body(request, &model, tool_name, temperature, true))
                .await?;
            text = Self::extract_envelope_text(&raw).unwrap_or_default();
        }

        let detection = llmgw_core::tool_detection::detect_openai_websearch_usage(Some(&raw), None);
        let citations = llmgw_citations::extract_openai(Some(&raw), None);

        meta.response_api = Some("responses_http".into());
        meta.tool_call_count = detection.tool_call_count;
        meta.anchored_citations_count = citations.iter().filter(|c| c.source_type == CitationType::Anchored).count() as u32;
        meta.unlinked_sources_count = citations.iter().filter(|c| c.source_type == CitationType::Unlinked).count() as u32;
        meta.citations_shape_set = detection.observed_kinds.clone();

        let grounded_effective = detection.tools_used;
        meta.grounded_effective = grounded_effective;

        if request.grounding_mode == GroundingMode::Required {
            if detection.tool_call_count == 0 {
                return Err(VendorError::GroundingRequiredFailed {
                    why_not_grounded: "no_tool_calls".into(),
                });
            }
            if citations.is_empty() {
                return Err(VendorError::GroundingRequiredFailed {
                    why_not_grounded: "no_citations_extracted".into(),
                });
            }
        } else if request.grounded && !grounded_effective {
            meta.why_not_grounded = Some("auto_mode_no_search".into());
        }

        let model_version = raw.get("model").and_then(Value::as_str).map_or(model, str::to_string);

        Ok(Response {
            content: text,
            success: true,
            model_version,
            vendor: "openai".into(),
            grounded_effective,
            usage: Self::parse_usage(&raw),
            latency_ms: start.elapsed().as_millis() as u64,
            citations,
            metadata: meta,
        })
    }

    async fn health_check(&self) -> Result<(), VendorError> {
        let body = json!({
            "model": "gpt-5",
            "input": [{"role": "user", "content": "ping"}],
            "max_output_tokens": 1,
        });
        self.send(&body).await.map(|_| ())
    }
}
