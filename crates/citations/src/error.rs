use thiserror::Error;

#[derive(Debug, Error)]
pub enum CitationError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("url blocked by ssrf guard: {0}")]
    Blocked(String),

    #[error("resolver called from an active async context; use the async entry point")]
    Reentrant,

    #[error("http resolution disabled")]
    Disabled,
}
