//! Model-server clients for AI Writer.

pub mod llama;

pub use llama::{ChatError, LlamaClient, REQUEST_TIMEOUT};
pub use reqwest::StatusCode;
