//! Provider A (OpenAI Responses-style) vendor adapter (§4.7).

pub mod adapter;
pub mod config;

pub use adapter::OpenAiAdapter;
pub use config::OpenAiConfig;
