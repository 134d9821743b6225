use llmgw_core::{ModelId, VendorId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BreakerError {
    #[error("circuit open for {vendor}/{model}")]
    Open { vendor: VendorId, model: ModelId },
}
