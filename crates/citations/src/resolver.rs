//! Optional redirector resolution (C3): sibling-field recovery, query-string
//! decoding, and — feature-gated — a bounded manual HTTP redirect walk, each
//! guarded by an SSRF check and a budget. Ported from
//! `citations/http_resolver.py` and `citations/resolver.py`.

use std::net::IpAddr;
use std::time::Duration;

use moka::sync::Cache;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ResolverError;
use crate::redirectors::{is_redirector, try_extract_target_from_query};

const BLOCKED_SCHEMES: &[&str] = &["data", "blob", "file", "javascript", "about"];

/// Reject before any network I/O: disallowed scheme, loopback/link-local,
/// RFC-1918 literal, or any parse failure (fail closed).
#[must_use]
pub fn is_blocked_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return true;
    };

    if BLOCKED_SCHEMES.contains(&parsed.scheme()) {
        return true;
    }
    if !matches!(parsed.scheme(), "http" | "https") {
        return true;
    }

    let Some(host) = parsed.host_str() else {
        return true;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if host == "localhost" {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_private_or_loopback(ip);
    }

    false
}

fn is_private_or_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

/// §4.3 resolver tunables. Deserializable from TOML via `#[serde(default)]`,
/// matching §6's `http_resolve_enabled`/`http_resolve_timeout_ms`/
/// `http_resolve_max_hops`/`http_resolve_cache_ttl_s` options (`max_hops`
/// there is named `http_resolve_max_hops`; `max_urls_per_request`/
/// `total_stopwatch` are this crate's own budget knobs, not separately
/// exposed in §6's table).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub http_resolve_enabled: bool,
    #[serde(with = "llmgw_core::duration_secs")]
    pub http_resolve_timeout: Duration,
    pub max_hops: usize,
    #[serde(with = "llmgw_core::duration_secs")]
    pub cache_ttl: Duration,
    pub max_urls_per_request: usize,
    #[serde(with = "llmgw_core::duration_secs")]
    pub total_stopwatch: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            http_resolve_enabled: false,
            http_resolve_timeout: Duration::from_millis(2000),
            max_hops: 3,
            cache_ttl: Duration::from_secs(86_400),
            max_urls_per_request: 8,
            total_stopwatch: Duration::from_millis(3000),
        }
    }
}

/// How a citation URL was (or wasn't) resolved to its terminal end-site URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    SiblingField(String),
    QueryString(String),
    Http(String),
    TruncatedByBudget,
    Unresolved,
}

pub struct Resolver {
    config: ResolverConfig,
    cache: Cache<String, Option<String>>,
}

impl Resolver {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();
        Self { config, cache }
    }

    /// Tier 1: recover a sibling field on the same raw payload node
    /// (`web.uri`, `reference.url`, `source.uri`, `support.url`, ...).
    fn sibling_field_recovery(raw: &Value) -> Option<String> {
        const CONTAINERS: &[&str] = &["web", "reference", "source", "support"];
        const FIELDS: &[&str] = &["uri", "url"];
        for container in CONTAINERS {
            let Some(node) = raw.get(container) else { continue };
            for field in FIELDS {
                if let Some(Value::String(s)) = node.get(field) {
                    return Some(s.clone());
                }
            }
        }
        None
    }

    /// Resolve a single citation URL through the 4-tier recovery chain
    /// (§4.2 "if host is a known redirector... attempt sibling-field
    /// recovery first, then query-parameter decoding, then optional HTTP
    /// resolution").
    pub fn resolve_citation_url(&self, url: &str, raw: &Value) -> Resolution {
        if !is_redirector_host(url) {
            return Resolution::Unresolved;
        }

        if let Some(sibling) = Self::sibling_field_recovery(raw) {
            return Resolution::SiblingField(sibling);
        }

        if let Some(target) = try_extract_target_from_query(url) {
            return Resolution::QueryString(target);
        }

        if self.config.http_resolve_enabled {
            if let Some(cached) = self.cache.get(url) {
                return cached.map(Resolution::Http).unwrap_or(Resolution::Unresolved);
            }
        }

        Resolution::Unresolved
    }

    /// Apply the per-request resolution budget (§4.3 "Budget") across a
    /// batch of candidate URLs, returning one [`Resolution`] per input in
    /// order. Once the stopwatch or URL-count budget is exceeded, all
    /// remaining candidates are marked truncated without further work.
    pub fn resolve_batch(&self, candidates: &[(String, Value)], elapsed: Duration) -> Vec<Resolution> {
        let mut results = Vec::with_capacity(candidates.len());
        let mut stopwatch_exhausted = elapsed >= self.config.total_stopwatch;

        for (idx, (url, raw)) in candidates.iter().enumerate() {
            if stopwatch_exhausted || idx >= self.config.max_urls_per_request {
                results.push(Resolution::TruncatedByBudget);
                continue;
            }
            results.push(self.resolve_citation_url(url, raw));
            if elapsed >= self.config.total_stopwatch {
                stopwatch_exhausted = true;
            }
        }
        results
    }

    pub fn cache_put(&self, url: &str, resolved: Option<String>) {
        self.cache.insert(url.to_string(), resolved);
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }
}

fn is_redirector_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(is_redirector))
        .unwrap_or(false)
}

/// Synchronous façade honoring the re-entrancy rule: if called from within
/// an already-running async runtime, return an error instead of blocking
/// (§4.3 "Re-entrancy").
#[cfg(feature = "http-resolve")]
pub fn resolve_sync(_url: &str) -> Result<Option<String>, ResolverError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ResolverError::Reentrant);
    }
    Err(ResolverError::Disabled)
}

#[cfg(not(feature = "http-resolve"))]
pub fn resolve_sync(_url: &str) -> Result<Option<String>, ResolverError> {
    Err(ResolverError::Disabled)
}

#[cfg(feature = "http-resolve")]
pub mod http {
    use std::time::Instant;

    use reqwest::redirect::Policy;
    use reqwest::{Client, StatusCode};

    use super::{is_blocked_url, is_redirector_host, ResolverConfig};
    use crate::redirectors::is_redirector;

    /// Follow redirects manually (HEAD first, ranged GET fallback) up to
    /// `max_hops`, stopping as soon as a non-redirector host is reached.
    pub async fn resolve_url_with_http(
        client: &Client,
        config: &ResolverConfig,
        url: &str,
    ) -> Option<String> {
        if !config.http_resolve_enabled || is_blocked_url(url) {
            return None;
        }

        let mut current = url.to_string();
        let mut visited = std::collections::HashSet::new();
        let deadline = Instant::now() + config.http_resolve_timeout;

        for _hop in 0..config.max_hops {
            if !visited.insert(current.clone()) {
                break;
            }
            if Instant::now() >= deadline {
                break;
            }

            let head_client = client.clone();
            let response = match head_client
                .head(&current)
                .timeout(config.http_resolve_timeout)
                .send()
                .await
            {
                Ok(r) => r,
                Err(_) => match client
                    .get(&current)
                    .header("Range", "bytes=0-0")
                    .timeout(config.http_resolve_timeout)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(_) => break,
                },
            };

            if is_redirect_status(response.status()) {
                let Some(location) = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                else {
                    break;
                };
                let Ok(next) = reqwest::Url::parse(&current).and_then(|base| base.join(location))
                else {
                    break;
                };
                let next_str = next.to_string();
                if is_blocked_url(&next_str) {
                    break;
                }
                if !matches!(next.scheme(), "http" | "https") {
                    break;
                }
                let Some(host) = next.host_str() else { break };
                if !is_redirector(host) {
                    return Some(next_str);
                }
                current = next_str;
            } else if !is_redirector_host(&current) {
                return Some(current);
            } else {
                break;
            }
        }

        None
    }

    fn is_redirect_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        )
    }

    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("reqwest client builder with no proxy config should never fail")
    }
}
