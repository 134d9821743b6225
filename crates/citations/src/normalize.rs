//! URL normalization and citation deduplication, ported from
//! `citation_utils.py`'s `normalize_url`/`dedupe_citations`.

use std::collections::HashMap;

use llmgw_core::Citation;
use url::Url;

use crate::domain::etld_plus_one;

const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "sr_share",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub normalized: String,
    pub original: String,
    pub domain_key: String,
}

fn parse_lenient(url: &str) -> Option<Url> {
    Url::parse(url)
        .or_else(|_| Url::parse(&format!("https://{url}")))
        .ok()
}

/// Normalize a URL: lowercase, strip tracking query params and fragment,
/// keep path and scheme. Returns `(normalized, original, domain_key)`,
/// matching the original's tuple shape.
#[must_use]
pub fn normalize_url(url: &str, resolved_url: Option<&str>) -> NormalizedUrl {
    if url.is_empty() {
        return NormalizedUrl {
            normalized: String::new(),
            original: String::new(),
            domain_key: String::new(),
        };
    }

    let original = url.to_string();
    let working = resolved_url.unwrap_or(url).to_ascii_lowercase();

    let Some(mut parsed) = parse_lenient(&working) else {
        return NormalizedUrl {
            normalized: url.to_string(),
            original,
            domain_key: parse_lenient(url)
                .and_then(|u| u.host_str().map(etld_plus_one))
                .unwrap_or_default(),
        };
    };

    let kept_pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept_pairs.is_empty() {
        parsed.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &kept_pairs {
            serializer.append_pair(k, v);
        }
        parsed.set_query(Some(&serializer.finish()));
    }
    parsed.set_fragment(None);

    let domain_key = parsed.host_str().map(etld_plus_one).unwrap_or_default();

    NormalizedUrl {
        normalized: parsed.to_string(),
        original,
        domain_key,
    }
}

fn citation_quality(citation: &Citation) -> i64 {
    let url_lower = citation.url.to_ascii_lowercase();
    let title = citation.title.as_deref().unwrap_or_default();
    let title_lower = title.to_ascii_lowercase();

    let mut score = 0i64;
    if url_lower.contains(".pdf") {
        score += 100;
    }
    if ["clinical", "research", "whitepaper", "study"]
        .iter()
        .any(|t| url_lower.contains(t))
    {
        score += 50;
    }
    if ["clinical", "research", "study", "trial"]
        .iter()
        .any(|t| title_lower.contains(t))
    {
        score += 25;
    }
    score += title.chars().count().min(100) as i64;
    score
}

/// Deduplicate citations by registrable domain, keeping the caller's
/// authority/official domains allowance of up to 2 when content types
/// differ (§4.2 "Deduplication"). Stable: running this twice on the same
/// list returns the same list.
#[must_use]
pub fn dedupe_citations(
    citations: &[Citation],
    official_domains: &[String],
    authority_domains: &[String],
    per_domain_cap: usize,
) -> Vec<Citation> {
    if citations.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<(String, Vec<Citation>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for citation in citations {
        if citation.url.is_empty() {
            continue;
        }
        let normalized = normalize_url(&citation.url, citation.resolved_url.as_deref());
        if normalized.domain_key.is_empty() {
            continue;
        }
        let idx = *index.entry(normalized.domain_key.clone()).or_insert_with(|| {
            groups.push((normalized.domain_key.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push(citation.clone());
    }

    let mut deduped = Vec::new();

    for (domain_key, mut group) in groups {
        let is_official = official_domains.iter().any(|d| d == &domain_key);
        let is_authority = authority_domains.iter().any(|d| d == &domain_key);

        group.sort_by_key(|c| std::cmp::Reverse(citation_quality(c)));

        let mut keep_count = 1usize;
        if group.len() > 1 {
            let has_pdf = group.iter().any(|c| c.url.to_ascii_lowercase().contains(".pdf"));
            let has_html = group.iter().any(|c| !c.url.to_ascii_lowercase().contains(".pdf"));
            let unique_paths: std::collections::HashSet<String> = group
                .iter()
                .filter_map(|c| Url::parse(&c.url).ok().map(|u| u.path().to_string()))
                .collect();

            if is_official && has_pdf && has_html {
                keep_count = per_domain_cap.min(2);
            } else if is_authority && unique_paths.len() > 1 {
                keep_count = per_domain_cap.min(2);
            } else if is_official || is_authority {
                keep_count = 1;
            }
        }
        keep_count = keep_count.min(group.len()).min(per_domain_cap);

        deduped.extend(group.into_iter().take(keep_count));
    }

    deduped
}

/// Recompute anchored/unlinked counts over a citation list (§4.2 "Counts").
#[must_use]
pub fn recompute_citation_counts(citations: &[Citation]) -> (u32, u32) {
    let mut anchored = 0;
    let mut unlinked = 0;
    for citation in citations {
        match citation.source_type {
            llmgw_core::CitationType::Unlinked => unlinked += 1,
            _ => anchored += 1,
        }
    }
    (anchored, unlinked)
}
