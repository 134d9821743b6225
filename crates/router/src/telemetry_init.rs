//! Minimal `tracing` subscriber bootstrap, trimmed from the teacher's
//! `acteon-server::telemetry` (OTLP exporter layer dropped — no metrics
//! backend is specified by this core; see `DESIGN.md`).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a `fmt` + `EnvFilter` subscriber (`RUST_LOG`, default `info`).
/// Call once at process startup; safe to call from tests via
/// `try_init` semantics (a second call is a no-op rather than a panic).
pub fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
