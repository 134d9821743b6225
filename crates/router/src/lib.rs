//! Single entry point for callers: vendor inference, allowlist/pinning,
//! ALS assembly, governed/circuit-protected dispatch, failover, and
//! telemetry (C8, §4.8).

pub mod builder;
pub mod config;
pub mod error;
pub mod router;
pub mod telemetry_init;

pub use builder::RouterBuilder;
pub use config::RouterConfig;
pub use error::RouterBuildError;
pub use router::Router;
pub use telemetry_init::init_tracing;
