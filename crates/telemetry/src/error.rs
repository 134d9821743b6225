use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("grounded=true record must carry a non-empty meta.response_api")]
    MissingResponseApi,

    #[error("success=false record must carry a non-empty error_code")]
    MissingErrorCode,
}
