use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;

pub mod model;
pub mod openrouter;

pub use model::{ChatMessage, ChatRequest, ChatResponse};
pub use openrouter::OpenRouterClient;

/// A chat-completion backend. Returns the decoded JSON body untouched so the
/// caller can inspect error members and keep the payload for diagnostics.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<Value, EngineError>;
}
