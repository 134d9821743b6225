use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::{ModelId, RequestId, VendorId};

/// A message role. Providers differ on which roles they accept; adapters
/// validate the full sequence (§4.7 "exactly two messages" for Provider B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn. `content` is carried as `Arc<str>` rather than `String` so
/// cloning a request for a retry or failover attempt never copies the
/// underlying bytes — the prompt-immutability invariant (§9) is enforced by
/// never exposing a mutable reference to this field anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Arc<str>,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<Arc<str>>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<Arc<str>>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<Arc<str>>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<Arc<str>>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Whether a grounded request tolerates the model skipping the search tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroundingMode {
    /// The model may or may not call the search tool.
    Auto,
    /// A response is acceptable only if grounding evidence was produced.
    Required,
}

impl Default for GroundingMode {
    fn default() -> Self {
        Self::Auto
    }
}

/// Ambient-location-signal context supplied by the caller; consumed once by
/// the router to invoke the ALS builder (C1). Never touched by the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlsContext {
    pub country_code: String,
    pub locale: Option<String>,
    pub timezone: Option<String>,
}

/// A normalized request accepted by [`crate::RouterError`]'s owner, the
/// router's `complete` entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    /// Omitted: inferred from `model`'s prefix table (§4.8 step 1).
    pub vendor: Option<VendorId>,
    pub model: ModelId,
    pub messages: Vec<Message>,
    pub grounded: bool,
    pub json_mode: bool,
    pub json_schema: Option<serde_json::Value>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub als_context: Option<AlsContext>,
    pub grounding_mode: GroundingMode,
    pub template_id: Option<String>,
    pub run_id: Option<String>,
    /// Sparse passthrough metadata, e.g. `grounding_mode` overrides callers
    /// supply by string key for forward compatibility (§3 "meta").
    #[serde(default)]
    pub meta: HashMap<String, serde_json::Value>,
}

impl Request {
    #[must_use]
    pub fn new(model: impl Into<ModelId>, messages: Vec<Message>) -> Self {
        Self {
            request_id: RequestId::new(uuid::Uuid::new_v4().to_string()),
            vendor: None,
            model: model.into(),
            messages,
            grounded: false,
            json_mode: false,
            json_schema: None,
            max_tokens: None,
            temperature: None,
            als_context: None,
            grounding_mode: GroundingMode::Auto,
            template_id: None,
            run_id: None,
            meta: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<VendorId>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    #[must_use]
    pub fn with_grounded(mut self, grounded: bool) -> Self {
        self.grounded = grounded;
        self
    }

    #[must_use]
    pub fn with_grounding_mode(mut self, mode: GroundingMode) -> Self {
        self.grounding_mode = mode;
        self
    }

    #[must_use]
    pub fn with_json_mode(mut self, json_mode: bool, schema: Option<serde_json::Value>) -> Self {
        self.json_mode = json_mode;
        self.json_schema = schema;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_als_context(mut self, als: AlsContext) -> Self {
        self.als_context = Some(als);
        self
    }

    /// Find the single user turn. Adapters that allow only one user message
    /// (Provider B) use this to validate the sequence.
    #[must_use]
    pub fn user_messages(&self) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.role == Role::User).collect()
    }

    #[must_use]
    pub fn system_messages(&self) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.role == Role::System).collect()
    }
}
