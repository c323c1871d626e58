use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::{ChatBackend, ChatRequest};
use crate::error::EngineError;
use crate::transport::{endpoint, http_client, read_json};

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// OpenRouter-compatible chat-completion client.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenRouterClient {
    pub fn new(api_base: &str, api_key: String, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: endpoint(api_base, "chat/completions")?,
            api_key,
        })
    }

    pub fn build_request(&self, body: &ChatRequest) -> Result<reqwest::Request, EngineError> {
        self.http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .header("X-Title", "visual-engine")
            .json(body)
            .build()
            .map_err(|err| EngineError::Transport(format!("failed to build chat request: {err}")))
    }
}

#[async_trait]
impl ChatBackend for OpenRouterClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Value, EngineError> {
        if self.api_key.trim().is_empty() {
            return Err(EngineError::Config("text.api_key is not configured".into()));
        }
        let http_request = self.build_request(request)?;
        debug!(
            url = %http_request.url(),
            model = %request.model,
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            "sending chat completion"
        );
        let response = self.http.execute(http_request).await?;
        read_json("text backend", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn client(key: &str) -> OpenRouterClient {
        OpenRouterClient::new(OPENROUTER_API_BASE, key.into(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn request_carries_bearer_and_budget() {
        let body = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            max_tokens: 400,
            temperature: 0.2,
        };
        let req = client("sk-test").build_request(&body).unwrap();
        assert_eq!(req.url().as_str(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(
            req.headers().get("authorization").unwrap().to_str().unwrap(),
            "Bearer sk-test"
        );
        let sent: Value =
            serde_json::from_slice(req.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(sent["max_tokens"], 400);
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["content"], "u");
    }

    #[test]
    fn debug_output_hides_key() {
        let printed = format!("{:?}", client("sk-secret"));
        assert!(!printed.contains("sk-secret"));
    }

    #[tokio::test]
    async fn missing_key_is_config_error_without_network() {
        let body = ChatRequest {
            model: "m".into(),
            messages: vec![],
            max_tokens: 1,
            temperature: 0.0,
        };
        let err = client("  ").complete(&body).await.unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
