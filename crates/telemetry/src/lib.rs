//! Normalized per-request telemetry record and emission sink (§6).

pub mod error;
pub mod record;
pub mod sink;

pub use error::TelemetryError;
pub use record::TelemetryRecord;
pub use sink::{InMemoryTelemetrySink, TelemetrySink, TracingTelemetrySink};
