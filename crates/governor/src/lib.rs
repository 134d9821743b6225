//! Rate/token admission governor (C5): token-budget, launch-slot stagger,
//! and concurrency gates composed behind a single `admit` call.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod governor;
pub mod launch_slot;
pub mod token_budget;

pub use concurrency::{ConcurrencyGate, ConcurrencySlot};
pub use config::GovernorConfig;
pub use error::GovernorError;
pub use governor::{Governor, GovernorPermit};
pub use launch_slot::LaunchSlot;
pub use token_budget::TokenBudget;
