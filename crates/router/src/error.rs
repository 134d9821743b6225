use thiserror::Error;

/// Errors raised while assembling a [`crate::RouterBuilder`]'s required
/// fields, distinct from [`llmgw_core::RouterError`] which covers
/// per-request failures at runtime.
#[derive(Debug, Error)]
pub enum RouterBuildError {
    #[error("at least one vendor adapter must be registered")]
    NoAdaptersRegistered,
}
