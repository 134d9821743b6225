//! Provider B (Gemini/Vertex) vendor adapter (§4.7).

pub mod adapter;
pub mod config;

pub use adapter::VertexAdapter;
pub use config::VertexConfig;

#[cfg(test)]
mod tests {
    use llmgw_core::{GroundingMode, Message, Request};
    use llmgw_provider::Adapter as _;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request(grounded: bool) -> Request {
        Request::new(
            "gemini-2.0-flash",
            vec![Message::system("you are helpful"), Message::user("what is the capital of france")],
        )
        .with_grounded(grounded)
    }

    #[tokio::test]
    async fn ungrounded_call_extracts_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Paris"}]}}],
                "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 1, "totalTokenCount": 9},
            })))
            .mount(&server)
            .await;

        let adapter = VertexAdapter::new(VertexConfig::new(server.uri(), "key")).unwrap();
        let resp = adapter.complete(&request(false)).await.unwrap();
        assert_eq!(resp.content, "Paris");
        assert!(!resp.grounded_effective);
        assert_eq!(resp.usage.total_tokens, 9);
    }

    #[tokio::test]
    async fn grounded_call_reports_citations_from_grounding_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Paris is the capital."}]},
                    "groundingMetadata": {
                        "groundingChunks": [{"web": {"uri": "https://example.org/paris", "title": "Paris"}}],
                        "webSearchQueries": ["capital of france"],
                    },
                }],
            })))
            .mount(&server)
            .await;

        let adapter = VertexAdapter::new(VertexConfig::new(server.uri(), "key")).unwrap();
        let resp = adapter.complete(&request(true)).await.unwrap();
        assert!(resp.grounded_effective);
        assert_eq!(resp.citations.len(), 1);
        assert_eq!(resp.citations[0].source_domain, "example.org");
    }

    #[tokio::test]
    async fn required_mode_without_grounding_metadata_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "no search happened"}]}}],
            })))
            .mount(&server)
            .await;

        let adapter = VertexAdapter::new(VertexConfig::new(server.uri(), "key")).unwrap();
        let req = request(true).with_grounding_mode(GroundingMode::Required);
        let err = adapter.complete(&req).await.unwrap_err();
        assert!(matches!(err, llmgw_core::VendorError::GroundingRequiredFailed { why_not_grounded } if why_not_grounded == "no_tool_calls"));
    }

    #[tokio::test]
    async fn forced_function_call_emits_structured_json_and_validates_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"functionCall": {"name": "emit_structured_response", "args": {"answer": "Paris"}}}]},
                    "groundingMetadata": {
                        "groundingChunks": [{"web": {"uri": "https://example.org/paris"}}],
                    },
                }],
            })))
            .mount(&server)
            .await;

        let adapter = VertexAdapter::new(VertexConfig::new(server.uri(), "key")).unwrap();
        let schema = json!({"type": "object", "required": ["answer"], "properties": {"answer": {"type": "string"}}});
        let req = request(true).with_json_mode(true, Some(schema));
        let resp = adapter.complete(&req).await.unwrap();
        assert_eq!(resp.content, r#"{"answer":"Paris"}"#);
        assert_eq!(resp.metadata.final_function_called, Some(true));
        assert_eq!(resp.metadata.schema_args_valid, Some(true));
    }

    #[tokio::test]
    async fn server_error_is_retried_and_eventually_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter =
            VertexAdapter::new(VertexConfig::new(server.uri(), "key").with_timeout(std::time::Duration::from_secs(2))).unwrap();
        let err = adapter.complete(&request(false)).await.unwrap_err();
        assert!(matches!(err, llmgw_core::VendorError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn rejects_requests_with_more_than_two_messages() {
        let server = MockServer::start().await;
        let adapter = VertexAdapter::new(VertexConfig::new(server.uri(), "key")).unwrap();
        let req = Request::new(
            "gemini-2.0-flash",
            vec![Message::system("ctx"), Message::user("a"), Message::user("b")],
        );
        let err = adapter.complete(&req).await.unwrap_err();
        assert!(matches!(err, llmgw_core::VendorError::Validation(_)));
    }
}
