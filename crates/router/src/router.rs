use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use llmgw_breaker::CircuitBreaker;
use llmgw_citations::{
    apply_http_resolution, apply_resolution, dedupe_citations, normalize_url, recompute_citation_counts, Resolver,
};
use llmgw_core::{Message, ModelId, Request, Response, ResponseMeta, Role, RouterError, VendorError, VendorId};
use llmgw_governor::Governor;
use llmgw_provider::DynAdapter;
use llmgw_telemetry::{TelemetryRecord, TelemetrySink};
use tracing::{info, instrument, warn};

use crate::config::RouterConfig;

#[derive(Debug, Clone, Default)]
struct AlsMetaFields {
    present: bool,
    country: Option<String>,
    variant_id: Option<String>,
    sha256: Option<String>,
    nfc_length: Option<usize>,
}

/// Single entry point for callers (C8, §4.8). Owns the per-process
/// Governor/breaker/resolver handles and the registered vendor adapters;
/// construct via [`crate::RouterBuilder`].
pub struct Router {
    pub(crate) adapters: HashMap<VendorId, Arc<dyn DynAdapter>>,
    pub(crate) model_vendor_prefixes: Vec<(String, VendorId)>,
    pub(crate) allowed_models: HashMap<VendorId, HashSet<ModelId>>,
    pub(crate) response_api_by_vendor: HashMap<VendorId, String>,
    pub(crate) failover_pairs: HashMap<VendorId, VendorId>,
    pub(crate) telemetry: Arc<dyn TelemetrySink>,
    pub(crate) governor: Governor,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) resolver: Resolver,
    pub(crate) config: RouterConfig,
    pub(crate) http_client: reqwest::Client,
}

impl Router {
    /// Current breaker state for `(vendor, model)`, for operational
    /// inspection and tests. Does not consult or mutate the breaker.
    #[must_use]
    pub fn circuit_state(&self, vendor: &VendorId, model: &ModelId) -> llmgw_breaker::CircuitState {
        self.breaker.state(vendor, model)
    }

    /// Find the vendor for `model` by longest matching prefix. Ties are
    /// broken by registration order (first registered prefix of the
    /// longest matching length wins).
    fn infer_vendor(&self, model: &ModelId) -> Option<VendorId> {
        self.model_vendor_prefixes
            .iter()
            .filter(|(prefix, _)| model.as_str().starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, vendor)| vendor.clone())
    }

    fn validate_allowlist(&self, vendor: &VendorId, model: &ModelId) -> Result<(), RouterError> {
        match self.allowed_models.get(vendor) {
            Some(set) if !set.is_empty() && !set.contains(model) => {
                Err(RouterError::UnknownModel(model.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// C1 ALS assembly (§4.8 step 3). Returns the request to dispatch
    /// (system turn rewritten, user turn untouched) and the provenance
    /// fields to stamp into the response/telemetry metadata. A country not
    /// present in [`llmgw_als::supported_countries`] is treated as "no ALS
    /// requested for this market" rather than an error.
    fn assemble_als(&self, request: &Request) -> Result<(Request, AlsMetaFields), RouterError> {
        let Some(ctx) = &request.als_context else {
            return Ok((request.clone(), AlsMetaFields::default()));
        };
        if !llmgw_als::supported_countries().contains(&ctx.country_code.as_str()) {
            return Ok((request.clone(), AlsMetaFields::default()));
        }

        let block = llmgw_als::render(&ctx.country_code, None, ctx.timezone.as_deref(), None, true).map_err(|e| match e {
            llmgw_als::AlsError::Overflow { actual, limit, .. } => RouterError::AlsOverflow { actual, limit },
            llmgw_als::AlsError::UnsupportedCountry(_) => {
                unreachable!("country was just checked against supported_countries()")
            }
        })?;

        let mut dispatch_request = request.clone();
        dispatch_request.messages = prepend_als_block(&request.messages, &block.rendered_text);

        Ok((
            dispatch_request,
            AlsMetaFields {
                present: true,
                country: Some(block.country_code),
                variant_id: Some(block.variant_id),
                sha256: Some(block.sha256),
                nfc_length: Some(block.nfc_length),
            },
        ))
    }

    /// Breaker check + Governor admission + adapter dispatch for a single
    /// vendor attempt (§4.8 steps 4–5). Does not perform failover; the
    /// caller decides whether to retry on a sibling.
    async fn dispatch_to_vendor(
        &self,
        vendor: &VendorId,
        model: &ModelId,
        request: &Request,
        deadline: Instant,
    ) -> Result<Response, RouterError> {
        let adapter = self
            .adapters
            .get(vendor)
            .ok_or_else(|| RouterError::UnknownModel(format!("{vendor}/{model}")))?;

        self.breaker
            .try_acquire_permit(vendor, model)
            .map_err(|_| RouterError::CircuitOpen {
                vendor: vendor.to_string(),
                model: model.to_string(),
            })?;

        let permit = self
            .governor
            .admit(vendor, self.config.estimated_tokens_per_request, request.grounded, deadline)
            .await
            .map_err(|_| RouterError::AdmissionTimeout { vendor: vendor.to_string() })?;

        match adapter.complete(request).await {
            Ok(response) => {
                permit.commit(response.usage.total_tokens);
                self.breaker.record_success(vendor, model);
                Ok(response)
            }
            Err(err) => {
                drop(permit);
                if err.is_breaker_counting() {
                    self.breaker.record_failure(vendor, model);
                }
                Err(RouterError::Vendor(err))
            }
        }
    }

    /// Whether `err` is one of the transient/circuit-open/upstream-503
    /// classes the Failover step (§4.8 step 6) retries on a sibling vendor.
    fn failover_reason(err: &RouterError) -> Option<&'static str> {
        match err {
            RouterError::CircuitOpen { .. } => Some("circuit_open"),
            RouterError::Vendor(VendorError::UpstreamUnavailable(_)) => Some("upstream_unavailable"),
            RouterError::Vendor(VendorError::Timeout(_)) => Some("timeout"),
            _ => None,
        }
    }

    fn why_not_grounded(err: &RouterError) -> Option<String> {
        match err {
            RouterError::Vendor(VendorError::GroundingRequiredFailed { why_not_grounded }) => {
                Some(why_not_grounded.clone())
            }
            _ => None,
        }
    }

    /// Dispatch `request` under the router's default deadline.
    pub async fn complete(&self, request: Request) -> Result<Response, RouterError> {
        let deadline = Instant::now() + self.config.default_deadline;
        self.complete_with_deadline(request, deadline).await
    }

    /// Dispatch `request`, propagated to every suspension point (§5
    /// "Scheduling model"): governor waits, breaker checks, the adapter's
    /// network call, its retry backoffs, and the resolver's HTTP hops.
    #[instrument(name = "router.complete", skip(self, request), fields(model = %request.model, grounded = request.grounded))]
    pub async fn complete_with_deadline(&self, request: Request, deadline: Instant) -> Result<Response, RouterError> {
        let start = Instant::now();

        // 1. Vendor inference.
        let vendor = match &request.vendor {
            Some(v) => v.clone(),
            None => self
                .infer_vendor(&request.model)
                .ok_or_else(|| RouterError::UnknownModel(request.model.to_string()))?,
        };

        // 2. Allowlist.
        self.validate_allowlist(&vendor, &request.model)?;

        // 3. ALS assembly.
        let (dispatch_request, als) = self.assemble_als(&request)?;

        // 4–5. Breaker + Governor + dispatch, with 6. Failover on a
        // configured sibling for transient/circuit-open/upstream errors.
        let primary = self.dispatch_to_vendor(&vendor, &request.model, &dispatch_request, deadline).await;

        let (final_vendor, mut outcome, vendor_path, failover_reason) = match primary {
            Ok(response) => (vendor.clone(), Ok(response), vec![vendor.to_string()], None),
            Err(err) => {
                let sibling = self
                    .config
                    .failover_enabled
                    .then(|| Self::failover_reason(&err).zip(self.failover_pairs.get(&vendor)))
                    .flatten();

                if let Some((reason, sibling_vendor)) = sibling {
                    info!(%vendor, sibling = %sibling_vendor, reason, "router attempting failover");
                    let sibling_outcome = self
                        .dispatch_to_vendor(sibling_vendor, &request.model, &dispatch_request, deadline)
                        .await;
                    (
                        sibling_vendor.clone(),
                        sibling_outcome,
                        vec![vendor.to_string(), sibling_vendor.to_string()],
                        Some(reason.to_string()),
                    )
                } else {
                    (vendor.clone(), Err(err), vec![vendor.to_string()], None)
                }
            }
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        let response_api = self.response_api_by_vendor.get(&final_vendor).cloned();

        // 7. Citation resolution/dedup (C2b/C3) runs only on success; a
        // failed dispatch has no citations to post-process.
        if let Ok(response) = &mut outcome {
            response.metadata.als_present = als.present;
            response.metadata.als_country = als.country.clone();
            response.metadata.als_variant_id = als.variant_id.clone();
            response.metadata.als_block_sha256 = als.sha256.clone();
            response.metadata.als_nfc_length = als.nfc_length;
            response.metadata.vendor_path = vendor_path.clone();
            response.metadata.failover_reason = failover_reason.clone();
            if response.metadata.response_api.is_none() {
                response.metadata.response_api = response_api.clone();
            }

            apply_resolution(&mut response.citations, &self.resolver);
            apply_http_resolution(&mut response.citations, &self.resolver, &self.http_client).await;
            for citation in &mut response.citations {
                citation.source_domain = normalize_url(&citation.url, citation.resolved_url.as_deref()).domain_key;
            }
            response.citations = dedupe_citations(
                &response.citations,
                &self.config.official_domains,
                &self.config.authority_domains,
                self.config.citation_domain_cap,
            );
            let (anchored, unlinked) = recompute_citation_counts(&response.citations);
            response.metadata.anchored_citations_count = anchored;
            response.metadata.unlinked_sources_count = unlinked;
        }

        // 8. Telemetry — exactly one row per request, success or failure.
        let record = self.build_telemetry_record(&request, &final_vendor, &outcome, latency_ms, &als, &vendor_path, &failover_reason, response_api);
        if let Err(e) = self.telemetry.emit(record).await {
            warn!(error = %e, "telemetry emission failed");
        }

        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn build_telemetry_record(
        &self,
        request: &Request,
        vendor: &VendorId,
        outcome: &Result<Response, RouterError>,
        latency_ms: u64,
        als: &AlsMetaFields,
        vendor_path: &[String],
        failover_reason: &Option<String>,
        response_api: Option<String>,
    ) -> TelemetryRecord {
        let tenant_id = request
            .meta
            .get("tenant_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        let (tokens_in, tokens_out, success, error_code, meta) = match outcome {
            Ok(response) => (
                response.usage.prompt_tokens,
                response.usage.completion_tokens,
                true,
                None,
                response.metadata.clone(),
            ),
            Err(err) => {
                let mut meta = ResponseMeta::default();
                meta.als_present = als.present;
                meta.als_country = als.country.clone();
                meta.als_variant_id = als.variant_id.clone();
                meta.als_block_sha256 = als.sha256.clone();
                meta.als_nfc_length = als.nfc_length;
                meta.vendor_path = vendor_path.to_vec();
                meta.failover_reason = failover_reason.clone();
                meta.response_api = response_api;
                meta.why_not_grounded = Self::why_not_grounded(err);
                (0, 0, false, Some(err.error_code().to_string()), meta)
            }
        };

        TelemetryRecord {
            ts: Utc::now(),
            request_id: request.request_id.clone(),
            tenant_id,
            vendor: vendor.to_string(),
            model: request.model.to_string(),
            grounded: request.grounded,
            json_mode: request.json_mode,
            latency_ms,
            tokens_in,
            tokens_out,
            cost_est_cents: None,
            success,
            error_code,
            meta,
        }
    }
}

/// Prepend `rendered` to the request's system turn, synthesizing one if
/// absent. Never touches a user-role message (§4.8 "Router must not
/// inspect or modify the user-message content").
fn prepend_als_block(messages: &[Message], rendered: &str) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    let mut inserted = false;
    for message in messages {
        if !inserted && message.role == Role::System {
            out.push(Message::system(format!("{rendered}\n\n{}", message.content)));
            inserted = true;
        } else {
            out.push(message.clone());
        }
    }
    if !inserted {
        out.insert(0, Message::system(rendered.to_string()));
    }
    out
}
