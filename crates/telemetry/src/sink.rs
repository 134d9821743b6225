//! Telemetry emission trait, grounded on
//! `acteon-audit::store::AuditStore`'s trait-plus-DTO shape, narrowed to
//! the single `emit` operation this spec needs (no query/cleanup/analytics
//! surface).

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TelemetryError;
use crate::record::TelemetryRecord;

fn validate(record: &TelemetryRecord) -> Result<(), TelemetryError> {
    if record.grounded && record.meta.response_api.as_deref().unwrap_or_default().is_empty() {
        return Err(TelemetryError::MissingResponseApi);
    }
    if !record.success && record.error_code.as_deref().unwrap_or_default().is_empty() {
        return Err(TelemetryError::MissingErrorCode);
    }
    Ok(())
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn emit(&self, record: TelemetryRecord) -> Result<(), TelemetryError>;
}

/// Emits each record as a structured `tracing` event at `info` level.
/// The default sink for deployments without a dedicated telemetry backend.
#[derive(Debug, Default)]
pub struct TracingTelemetrySink;

#[async_trait]
impl TelemetrySink for TracingTelemetrySink {
    async fn emit(&self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        validate(&record)?;
        tracing::info!(
            request_id = %record.request_id,
            vendor = %record.vendor,
            model = %record.model,
            grounded = record.grounded,
            success = record.success,
            latency_ms = record.latency_ms,
            error_code = record.error_code.as_deref().unwrap_or(""),
            "request completed"
        );
        Ok(())
    }
}

/// In-process sink retaining every record, for tests and for local
/// development without a telemetry backend configured.
#[derive(Debug, Default)]
pub struct InMemoryTelemetrySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl InMemoryTelemetrySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl TelemetrySink for InMemoryTelemetrySink {
    async fn emit(&self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        validate(&record)?;
        self.records.lock().push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use llmgw_core::{RequestId, ResponseMeta};

    fn base_record() -> TelemetryRecord {
        TelemetryRecord {
            ts: Utc::now(),
            request_id: RequestId::new("r1"),
            tenant_id: None,
            vendor: "openai".into(),
            model: "gpt-5".into(),
            grounded: false,
            json_mode: false,
            latency_ms: 10,
            tokens_in: 5,
            tokens_out: 5,
            cost_est_cents: None,
            success: true,
            error_code: None,
            meta: ResponseMeta::default(),
        }
    }

    #[tokio::test]
    async fn in_memory_sink_retains_valid_records() {
        let sink = InMemoryTelemetrySink::new();
        sink.emit(base_record()).await.unwrap();
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn grounded_record_without_response_api_is_rejected() {
        let sink = InMemoryTelemetrySink::new();
        let mut record = base_record();
        record.grounded = true;
        let err = sink.emit(record).await.unwrap_err();
        assert!(matches!(err, TelemetryError::MissingResponseApi));
    }

    #[tokio::test]
    async fn grounded_record_with_response_api_is_accepted() {
        let sink = InMemoryTelemetrySink::new();
        let mut record = base_record();
        record.grounded = true;
        record.meta.response_api = Some("responses".into());
        sink.emit(record).await.unwrap();
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn failed_record_without_error_code_is_rejected() {
        let sink = InMemoryTelemetrySink::new();
        let mut record = base_record();
        record.success = false;
        let err = sink.emit(record).await.unwrap_err();
        assert!(matches!(err, TelemetryError::MissingErrorCode));
    }

    #[tokio::test]
    async fn failed_record_with_error_code_is_accepted() {
        let sink = InMemoryTelemetrySink::new();
        let mut record = base_record();
        record.success = false;
        record.error_code = Some("timeout".into());
        sink.emit(record).await.unwrap();
    }

    #[tokio::test]
    async fn tracing_sink_enforces_the_same_contract() {
        let sink = TracingTelemetrySink;
        let mut record = base_record();
        record.grounded = true;
        let err = sink.emit(record).await.unwrap_err();
        assert!(matches!(err, TelemetryError::MissingResponseApi));
    }
}
