//! Typed failures shared by the text and image pipelines.
use serde::Serialize;
use thiserror::Error;

use crate::model::ProviderKind;

/// Longest raw-body excerpt carried by a malformed-response error.
pub const SNIPPET_LIMIT: usize = 200;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Missing or invalid input, caught before any network call.
    #[error("{0}")]
    Validation(String),
    /// Missing credential or unusable configuration.
    #[error("{0}")]
    Config(String),
    /// Non-success status or explicit error object; message is verbatim.
    #[error("{0}")]
    Upstream(String),
    #[error("{context}: {snippet}")]
    MalformedResponse { context: String, snippet: String },
    #[error("generation timed out")]
    Timeout,
    /// Network stack failure (connect, TLS, body read).
    #[error("{0}")]
    Transport(String),
}

impl EngineError {
    pub fn malformed(context: impl Into<String>, body: &str) -> Self {
        EngineError::MalformedResponse {
            context: context.into(),
            snippet: snippet(body),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Validation(_) => FailureKind::Validation,
            EngineError::Config(_) => FailureKind::Config,
            EngineError::Upstream(_) => FailureKind::Upstream,
            EngineError::MalformedResponse { .. } => FailureKind::MalformedResponse,
            EngineError::Timeout => FailureKind::Timeout,
            EngineError::Transport(_) => FailureKind::Transport,
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Config,
    Upstream,
    MalformedResponse,
    Timeout,
    Transport,
    /// The job reached `failed` with or without a provider message.
    JobFailed,
    /// The job succeeded but nothing normalised into an image.
    NoImage,
}

/// Failure of a visual generation call, with the dispatch context attached.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error("{reason} (provider={provider}, model={model}, count={count})")]
pub struct VisualFailure {
    pub kind: FailureKind,
    pub reason: String,
    pub provider: ProviderKind,
    pub model: String,
    pub count: u32,
}

/// Bounded excerpt of a response body for diagnostics.
pub fn snippet(body: &str) -> String {
    if body.chars().count() <= SNIPPET_LIMIT {
        return body.to_string();
    }
    body.chars().take(SNIPPET_LIMIT).collect::<String>() + "…"
}
