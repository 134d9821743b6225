use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("token budget exceeded deadline while waiting for the next minute window")]
    TokenBudgetDeadlineExceeded,
}
