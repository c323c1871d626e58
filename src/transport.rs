use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::error::EngineError;

pub fn http_client(timeout: Duration) -> Result<Client, EngineError> {
    Client::builder()
        .user_agent("visual-engine/0.1")
        .timeout(timeout)
        .build()
        .map_err(|err| EngineError::Config(format!("failed to build HTTP client: {err}")))
}

/// Join `path` onto an API base, keeping any path segments already on the base.
pub fn endpoint(api_base: &str, path: &str) -> Result<Url, EngineError> {
    let raw = format!(
        "{}/{}",
        api_base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&raw).map_err(|err| EngineError::Config(format!("invalid API URL {raw}: {err}")))
}

/// Read a response as JSON. Non-success statuses keep the body verbatim;
/// non-JSON bodies become a malformed-response error with a bounded snippet.
pub async fn read_json(provider: &str, response: Response) -> Result<Value, EngineError> {
    let status = response.status();
    let body = response.text().await?;
    decode_body(provider, status, &body)
}

pub fn decode_body(provider: &str, status: StatusCode, body: &str) -> Result<Value, EngineError> {
    if !status.is_success() {
        warn!(provider, %status, "backend returned error status");
        return Err(EngineError::Upstream(format!(
            "{provider} error {}: {}",
            status.as_u16(),
            body
        )));
    }
    serde_json::from_str(body)
        .map_err(|_| EngineError::malformed(format!("{provider} returned invalid JSON"), body))
}

/// Text of an explicit `error` member, if the payload carries a non-null one.
pub fn error_message(payload: &Value) -> Option<String> {
    match payload.get("error")? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => Some(
            obj.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}
