//! Known vendor/search redirector hosts, ported from the original
//! `citations/redirectors.py` table.

use url::Url;

pub struct RedirectorConfig {
    pub host: &'static str,
    pub path_contains: &'static [&'static str],
    pub end_site_query_keys: &'static [&'static str],
}

pub const REDIRECTOR_HOSTS: &[RedirectorConfig] = &[
    RedirectorConfig {
        host: "vertexaisearch.cloud.google.com",
        path_contains: &["/grounding-api-redirect/"],
        end_site_query_keys: &["url", "target", "u", "dest", "destination"],
    },
    RedirectorConfig {
        host: "www.google.com",
        path_contains: &["/url", "/imgres"],
        end_site_query_keys: &["q", "url"],
    },
    RedirectorConfig {
        host: "news.google.com",
        path_contains: &["/rss/articles/"],
        end_site_query_keys: &["url"],
    },
    RedirectorConfig {
        // fallback only; prefer HEAD resolution if allowed.
        host: "t.co",
        path_contains: &[],
        end_site_query_keys: &["url"],
    },
];

fn config_for_host(host: &str) -> Option<&'static RedirectorConfig> {
    let host = host.to_ascii_lowercase();
    REDIRECTOR_HOSTS
        .iter()
        .find(|c| host == c.host || host.ends_with(&format!(".{}", c.host)))
}

#[must_use]
pub fn is_redirector(host: &str) -> bool {
    config_for_host(host).is_some()
}

/// Parse the `end_site_query_keys` of a redirector URL, returning the first
/// candidate target that is itself an `http(s)` URL with a host and is not
/// in turn a redirector.
#[must_use]
pub fn try_extract_target_from_query(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let cfg = config_for_host(host)?;

    for (key, value) in parsed.query_pairs() {
        if !cfg.end_site_query_keys.contains(&key.as_ref()) {
            continue;
        }
        let Ok(candidate) = Url::parse(&value) else {
            continue;
        };
        if !matches!(candidate.scheme(), "http" | "https") {
            continue;
        }
        let Some(candidate_host) = candidate.host_str() else {
            continue;
        };
        if is_redirector(candidate_host) {
            continue;
        }
        return Some(candidate.to_string());
    }
    None
}

#[must_use]
pub fn path_looks_like_redirect(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let Some(cfg) = config_for_host(host) else {
        return false;
    };
    cfg.path_contains.iter().any(|seg| parsed.path().contains(seg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_redirector_hosts_and_subdomains() {
        assert!(is_redirector("vertexaisearch.cloud.google.com"));
        assert!(is_redirector("sub.t.co"));
        assert!(!is_redirector("example.com"));
    }

    #[test]
    fn extracts_target_from_vertex_redirect_query() {
        let url = "https://vertexaisearch.cloud.google.com/grounding-api-redirect/abc?url=https%3A%2F%2Fwww.example.org%2Fa";
        let target = try_extract_target_from_query(url).unwrap();
        assert_eq!(target, "https://www.example.org/a");
    }

    #[test]
    fn rejects_target_that_is_itself_a_redirector() {
        let url = "https://www.google.com/url?q=https%3A%2F%2Fnews.google.com%2Frss%2Farticles%2Fxyz";
        assert!(try_extract_target_from_query(url).is_none());
    }

    #[test]
    fn non_redirector_host_yields_none() {
        assert!(try_extract_target_from_query("https://example.com/page?url=https://other.test").is_none());
    }
}
