use std::time::Duration;

/// Configuration for [`crate::adapter::VertexAdapter`], mirroring
/// `crates/llm/src/config.rs`'s endpoint/key/tunables shape.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl VertexConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_thirty_second_timeout() {
        let config = VertexConfig::new("https://vertex.test/v1/generate", "key");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
