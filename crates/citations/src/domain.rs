//! Registrable-domain (eTLD+1) computation via a hardcoded multi-level-TLD
//! table, ported from the original citation utilities. A real public-suffix
//! list is much larger; this table covers the multi-level TLDs the upstream
//! service's traffic actually observed and keeps the crate dependency-free
//! for this one concern.

use std::collections::HashSet;
use std::sync::LazyLock;

static MULTI_LEVEL_TLDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "co.uk", "co.jp", "co.kr", "co.in", "co.id", "co.il", "co.za", "com.au", "com.br",
        "com.cn", "com.mx", "com.tw", "com.ar", "com.sg", "net.au", "net.br", "net.cn", "net.mx",
        "net.tw", "net.ar", "org.uk", "org.au", "org.br", "org.cn", "org.mx", "org.tw", "gov.uk",
        "gov.au", "gov.br", "gov.cn", "gov.mx", "gov.in", "edu.au", "edu.br", "edu.cn", "edu.mx",
        "edu.sg", "edu.tw", "ac.uk", "ac.jp", "ac.kr", "ac.in", "ac.il", "ac.za", "nih.gov",
        "europa.eu",
    ]
    .into_iter()
    .collect()
});

/// Extract the eTLD+1 (registrable domain) from a host string, e.g.
/// `www.bbc.co.uk` -> `bbc.co.uk`, `blog.example.com` -> `example.com`.
/// Returns an empty string if the host cannot be parsed into at least one
/// label.
#[must_use]
pub fn etld_plus_one(host: &str) -> String {
    let mut host = host.to_ascii_lowercase();
    if let Some(stripped) = host.strip_prefix("www.") {
        host = stripped.to_string();
    }
    if let Some((h, _port)) = host.rsplit_once(':') {
        if h.chars().all(|c| c != ']') {
            host = h.to_string();
        }
    }

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return host;
    }

    if parts.len() >= 3 {
        let candidate = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        if MULTI_LEVEL_TLDS.contains(candidate.as_str()) {
            return format!(
                "{}.{}.{}",
                parts[parts.len() - 3],
                parts[parts.len() - 2],
                parts[parts.len() - 1]
            );
        }
    }

    format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_domain() {
        assert_eq!(etld_plus_one("www.example.com"), "example.com");
    }

    #[test]
    fn multi_level_tld() {
        assert_eq!(etld_plus_one("www.bbc.co.uk"), "bbc.co.uk");
        assert_eq!(etld_plus_one("shop.example.com.au"), "example.com.au");
    }

    #[test]
    fn subdomain_without_multi_level_tld() {
        assert_eq!(etld_plus_one("blog.github.io"), "github.io");
    }

    #[test]
    fn strips_port() {
        assert_eq!(etld_plus_one("example.com:8080"), "example.com");
    }
}
