//! Citation extraction, URL normalization/dedup, and redirector resolution
//! (C2/C2b/C3).

pub mod domain;
pub mod error;
pub mod extractor;
pub mod normalize;
pub mod redirectors;
pub mod resolver;

pub use domain::etld_plus_one;
pub use error::{CitationError, ResolverError};
#[cfg(feature = "http-resolve")]
pub use extractor::apply_http_resolution;
#[cfg(feature = "http-resolve")]
pub use resolver::http::client as http_resolve_client;
pub use extractor::{apply_resolution, extract_openai, extract_vertex, GroundingSummary};
pub use normalize::{dedupe_citations, normalize_url, recompute_citation_counts, NormalizedUrl};
pub use redirectors::{is_redirector, path_looks_like_redirect, try_extract_target_from_query};
pub use resolver::{is_blocked_url, Resolution, Resolver, ResolverConfig};
