use std::time::Instant;

use llmgw_core::{CitationType, GroundingMode, Request, Response, ResponseMeta, Usage, VendorError};
use llmgw_provider::{retry_with_backoff, RetryPolicy};
use serde_json::{json, Value};

use crate::config::VertexConfig;

const FUNCTION_NAME: &str = "emit_structured_response";

fn classify_transport_error(err: reqwest::Error) -> VendorError {
    if err.is_timeout() {
        VendorError::Timeout(std::time::Duration::from_secs(30))
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

fn required_keys(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Provider B (Gemini/Vertex) adapter. Exactly two messages (system + user)
/// are accepted (§4.7); extra turns are a typed validation error rather than
/// silently dropped or concatenated. The grounded-JSON path declares a
/// schema function alongside the search tool and forces the model to call
/// it (§4.7, §9 Open Question (a)) rather than the original's two-step
/// attest-then-reshape flow.
#[derive(Debug)]
pub struct VertexAdapter {
    client: reqwest::Client,
    config: VertexConfig,
}

impl VertexAdapter {
    pub fn new(config: VertexConfig) -> Result<Self, VendorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VendorError::Internal(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn validate_messages(request: &Request) -> Result<(&llmgw_core::Message, &llmgw_core::Message), VendorError> {
        if request.messages.len() != 2 {
            return Err(VendorError::Validation(format!(
                "vertex adapter accepts exactly two messages (system, user), got {}",
                request.messages.len()
            )));
        }
        let system = request.system_messages().into_iter().next();
        let user = request.user_messages().into_iter().next();
        match (system, user) {
            (Some(system), Some(user)) => Ok((system, user)),
            _ => Err(VendorError::Validation(
                "vertex adapter requires one system and one user message".into(),
            )),
        }
    }

    fn build_body(request: &Request, system: &llmgw_core::Message, user: &llmgw_core::Message) -> Value {
        let mut body = json!({
            "system_instruction": {"parts": [{"text": system.content.as_ref()}]},
            "contents": [{"role": "user", "parts": [{"text": user.content.as_ref()}]}],
        });

        if let Some(temperature) = request.temperature {
            body["generation_config"] = json!({"temperature": temperature});
        }

        let mut tools = Vec::new();
        if request.grounded {
            tools.push(json!({"google_search": {}}));
        }

        if request.grounded && request.json_mode {
            if let Some(schema) = &request.json_schema {
                tools.push(json!({
                    "function_declarations": [{
                        "name": FUNCTION_NAME,
                        "description": "Emit the final structured response.",
                        "parameters": schema,
                    }]
                }));
                body["tool_config"] = json!({
                    "function_calling_config": {"mode": "ANY", "allowed_function_names": [FUNCTION_NAME]}
                });
            }
        }

        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
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

    fn candidate(response: &Value) -> Option<&Value> {
        response.get("candidates").and_then(Value::as_array).and_then(|c| c.first())
    }

    fn parts(response: &Value) -> Vec<&Value> {
        Self::candidate(response)
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| parts.iter().collect())
            .unwrap_or_default()
    }

    fn function_call(response: &Value) -> Option<&Value> {
        Self::parts(response).into_iter().find_map(|p| p.get("functionCall"))
    }

    fn text_parts(response: &Value) -> String {
        Self::parts(response)
            .into_iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("")
    }

    fn parse_usage(response: &Value) -> Usage {
        let usage = response.get("usageMetadata");
        let field = |key: &str| usage.and_then(|u| u.get(key)).and_then(Value::as_u64).unwrap_or(0) as u32;
        Usage {
            prompt_tokens: field("promptTokenCount"),
            completion_tokens: field("candidatesTokenCount"),
            reasoning_tokens: 0,
            total_tokens: field("totalTokenCount"),
        }
    }
}

impl llmgw_provider::Adapter for VertexAdapter {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn complete(&self, request: &Request) -> Result<Response, VendorError> {
        let (system, user) = Self::validate_messages(request)?;
        let forced_function_call = request.grounded && request.json_mode && request.json_schema.is_some();

        let start = Instant::now();
        let raw = retry_with_backoff(RetryPolicy::default(), VendorError::is_retryable, |_attempt| {
            let body = Self::build_body(request, system, user);
            async move { self.send(&body).await }
        })
        .await?;

        let mut meta = ResponseMeta::default();
        meta.response_api = Some("generate_content".into());

        let grounding_metadata = Self::candidate(&raw)
            .and_then(|c| c.get("groundingMetadata").or_else(|| c.get("grounding_metadata")))
            .cloned()
            .unwrap_or(Value::Null);

        let content = if forced_function_call {
            let call = Self::function_call(&raw);
            meta.final_function_called = Some(call.is_some());
            let args = call.and_then(|c| c.get("args")).cloned().unwrap_or(Value::Null);

            let schema = request.json_schema.as_ref().expect("checked by forced_function_call");
            let missing_required = required_keys(schema)
                .into_iter()
                .any(|key| args.get(&key).is_none());
            meta.schema_args_valid = Some(call.is_some() && !missing_required);

            serde_json::to_string(&args).unwrap_or_default()
        } else {
            Self::text_parts(&raw)
        };

        let (citations, summary) = if grounding_metadata.is_null() {
            (Vec::new(), llmgw_citations::GroundingSummary::default())
        } else {
            llmgw_citations::extract_vertex(&grounding_metadata, content.len())
        };

        let detection = llmgw_core::tool_detection::detect_vertex_grounding_usage(Some(&raw), None);
        meta.tool_call_count = detection.signal_count;
        meta.anchored_citations_count =
            citations.iter().filter(|c| c.source_type == CitationType::Anchored).count() as u32;
        meta.unlinked_sources_count =
            citations.iter().filter(|c| c.source_type == CitationType::Unlinked).count() as u32;
        meta.citations_shape_set = detection.signals.clone();

        let grounded_effective = !grounding_metadata.is_null() && (detection.tools_used || !citations.is_empty());
        meta.grounded_effective = grounded_effective;
        meta.feature_flags.insert("web_search_queries_used".into(), summary.query_count > 0);

        if request.grounding_mode == GroundingMode::Required {
            let evidence_ok = if forced_function_call {
                meta.final_function_called == Some(true) && meta.schema_args_valid == Some(true)
            } else {
                detection.signal_count >= 1 && !citations.is_empty()
            };
            if !evidence_ok {
                let why = if forced_function_call {
                    "no_tool_calls"
                } else if detection.signal_count == 0 {
                    "no_tool_calls"
                } else {
                    "no_citations_extracted"
                };
                return Err(VendorError::GroundingRequiredFailed {
                    why_not_grounded: why.into(),
                });
            }
        } else if request.grounded && !grounded_effective {
            meta.why_not_grounded = Some("auto_mode_no_search".into());
        }

        let model_version = raw
            .get("modelVersion")
            .and_then(Value::as_str)
            .map_or_else(|| request.model.as_str().to_string(), str::to_string);

        Ok(Response {
            content,
            success: true,
            model_version,
            vendor: "vertex".into(),
            grounded_effective,
            usage: Self::parse_usage(&raw),
            latency_ms: start.elapsed().as_millis() as u64,
            citations,
            metadata: meta,
        })
    }

    async fn health_check(&self) -> Result<(), VendorError> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": "ping"}]}],
        });
        self.send(&body).await.map(|_| ())
    }
}
