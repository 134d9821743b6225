use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use llmgw_breaker::CircuitBreaker;
use llmgw_citations::{http_resolve_client, Resolver};
use llmgw_core::{ModelId, VendorId};
use llmgw_governor::Governor;
use llmgw_provider::DynAdapter;
use llmgw_telemetry::{TelemetrySink, TracingTelemetrySink};

use crate::config::RouterConfig;
use crate::error::RouterBuildError;
use crate::router::Router;

/// Fluent builder for constructing a [`Router`] instance.
///
/// At minimum one vendor adapter must be registered via
/// [`adapter`](Self::adapter). Every other field has a default: no model
/// prefixes (callers must supply `request.vendor` directly), no allowlist
/// (any model is permitted), failover disabled, and a
/// [`TracingTelemetrySink`] when no sink is configured.
pub struct RouterBuilder {
    adapters: HashMap<VendorId, Arc<dyn DynAdapter>>,
    model_vendor_prefixes: Vec<(String, VendorId)>,
    allowed_models: HashMap<VendorId, HashSet<ModelId>>,
    response_api_by_vendor: HashMap<VendorId, String>,
    failover_pairs: HashMap<VendorId, VendorId>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    config: RouterConfig,
}

impl RouterBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            model_vendor_prefixes: Vec::new(),
            allowed_models: HashMap::new(),
            response_api_by_vendor: HashMap::new(),
            failover_pairs: HashMap::new(),
            telemetry: None,
            config: RouterConfig::default(),
        }
    }

    /// Register the adapter that serves `vendor`. Registering the same
    /// vendor twice replaces the previous adapter.
    #[must_use]
    pub fn adapter(mut self, vendor: impl Into<VendorId>, adapter: Arc<dyn DynAdapter>) -> Self {
        self.adapters.insert(vendor.into(), adapter);
        self
    }

    /// Add a model-name prefix that infers `vendor` when a request omits
    /// `vendor` explicitly (§4.8 step 1). Longest matching prefix wins.
    #[must_use]
    pub fn model_prefix(mut self, prefix: impl Into<String>, vendor: impl Into<VendorId>) -> Self {
        self.model_vendor_prefixes.push((prefix.into(), vendor.into()));
        self
    }

    /// Restrict `vendor` to the given models (§4.8 step 2). Calling this
    /// more than once for the same vendor extends the allowed set rather
    /// than replacing it; a vendor with no entry here permits any model.
    #[must_use]
    pub fn allowed_models(mut self, vendor: impl Into<VendorId>, models: impl IntoIterator<Item = impl Into<ModelId>>) -> Self {
        self.allowed_models
            .entry(vendor.into())
            .or_default()
            .extend(models.into_iter().map(Into::into));
        self
    }

    /// Record the `response_api` breadcrumb a vendor's adapter stamps on
    /// success, so the telemetry contract (grounded⇒`response_api`
    /// non-empty, §6) still holds on a request that fails before the
    /// adapter returns a `Response` to overlay it from.
    #[must_use]
    pub fn response_api(mut self, vendor: impl Into<VendorId>, api: impl Into<String>) -> Self {
        self.response_api_by_vendor.insert(vendor.into(), api.into());
        self
    }

    /// Register `sibling` as the failover target for `vendor` (§4.8 step
    /// 6). Only consulted when [`RouterConfig::failover_enabled`] is set.
    #[must_use]
    pub fn failover_pair(mut self, vendor: impl Into<VendorId>, sibling: impl Into<VendorId>) -> Self {
        self.failover_pairs.insert(vendor.into(), sibling.into());
        self
    }

    /// Set the telemetry sink every request emits exactly one row to.
    #[must_use]
    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Set the scalar tunables (governor/breaker/resolver configuration,
    /// failover flag, deadlines, citation dedup policy).
    #[must_use]
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Consume the builder and produce a configured [`Router`].
    ///
    /// Returns [`RouterBuildError::NoAdaptersRegistered`] if no adapter was
    /// registered via [`adapter`](Self::adapter).
    pub fn build(self) -> Result<Router, RouterBuildError> {
        if self.adapters.is_empty() {
            return Err(RouterBuildError::NoAdaptersRegistered);
        }

        Ok(Router {
            adapters: self.adapters,
            model_vendor_prefixes: self.model_vendor_prefixes,
            allowed_models: self.allowed_models,
            response_api_by_vendor: self.response_api_by_vendor,
            failover_pairs: self.failover_pairs,
            telemetry: self.telemetry.unwrap_or_else(|| Arc::new(TracingTelemetrySink)),
            governor: Governor::new(self.config.governor.clone()),
            breaker: CircuitBreaker::new(self.config.breaker.clone()),
            resolver: Resolver::new(self.config.resolver.clone()),
            http_client: http_resolve_client(),
            config: self.config,
        })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_adapters_fails() {
        let result = RouterBuilder::new().build();
        assert!(matches!(result, Err(RouterBuildError::NoAdaptersRegistered)));
    }
}
