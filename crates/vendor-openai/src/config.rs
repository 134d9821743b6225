use std::collections::HashMap;
use std::time::Duration;

/// Configuration for [`crate::adapter::OpenAiAdapter`]. Grounded on
/// `crates/llm/src/config.rs`'s `LlmGuardrailConfig` shape (endpoint +
/// api_key + model + tunables with builder methods), extended with the
/// grounding-specific knobs §4.7 requires.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Fixed temperature grounded models must use, overriding the caller's
    /// request (§4.7 "Temperature policy").
    pub grounded_temperature: Option<f32>,
    /// `conversational_model -> grounded_sibling` swapped in whenever a
    /// request demands grounding (§4.7 "Model pinning").
    pub model_adjust_for_grounding: HashMap<String, String>,
    /// Gate for the empty-output JSON-envelope retry (§4.7 "Empty-output
    /// quirk"). Never applied to grounded calls regardless of this flag.
    pub ungrounded_json_envelope_fallback: bool,
}

impl OpenAiConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            grounded_temperature: None,
            model_adjust_for_grounding: HashMap::new(),
            ungrounded_json_envelope_fallback: false,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_grounded_temperature(mut self, temperature: f32) -> Self {
        self.grounded_temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_model_pin(mut self, conversational: impl Into<String>, grounded: impl Into<String>) -> Self {
        self.model_adjust_for_grounding.insert(conversational.into(), grounded.into());
        self
    }

    #[must_use]
    pub fn with_ungrounded_json_envelope_fallback(mut self, enabled: bool) -> Self {
        self.ungrounded_json_envelope_fallback = enabled;
        self
    }
}
