//! Synchronous batch provider speaking the Together images API.
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{ImageProvider, ImageRequest, SubmitMode, Submission};
use crate::error::EngineError;
use crate::model::ProviderKind;
use crate::transport::{endpoint, error_message, http_client, read_json};

pub const TOGETHER_API_BASE: &str = "https://api.together.xyz/v1";
pub const DEFAULT_TOGETHER_MODEL: &str = "black-forest-labs/FLUX.1-schnell-Free";

#[derive(Clone)]
pub struct TogetherSettings {
    pub api_base: String,
    pub api_key: String,
    pub default_model: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    /// Most images the backend accepts in one call.
    pub max_images: u32,
    pub timeout: Duration,
}

impl Default for TogetherSettings {
    fn default() -> Self {
        Self {
            api_base: TOGETHER_API_BASE.to_string(),
            api_key: String::new(),
            default_model: DEFAULT_TOGETHER_MODEL.to_string(),
            width: 1024,
            height: 1024,
            steps: 4,
            max_images: 4,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Clone)]
pub struct TogetherProvider {
    http: Client,
    settings: TogetherSettings,
}

impl fmt::Debug for TogetherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TogetherProvider")
            .field("api_base", &self.settings.api_base)
            .field("default_model", &self.settings.default_model)
            .finish_non_exhaustive()
    }
}

impl TogetherProvider {
    pub fn new(settings: TogetherSettings) -> Result<Self, EngineError> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            settings,
        })
    }

    /// Request body; `n` is clamped to `1..=max_images`.
    pub fn build_body(&self, request: &ImageRequest) -> Value {
        let s = &self.settings;
        let model = match request.model.trim() {
            "" => s.default_model.as_str(),
            model => model,
        };
        json!({
            "model": model,
            "prompt": request.prompt.trim(),
            "width": request.options.width.unwrap_or(s.width),
            "height": request.options.height.unwrap_or(s.height),
            "steps": request.options.steps.unwrap_or(s.steps),
            "n": request.count.clamp(1, s.max_images.max(1)),
            "response_format": "b64_json",
        })
    }
}

/// Accept a decoded batch response only if it carries a `data` array.
pub fn check_batch(payload: Value) -> Result<Value, EngineError> {
    if let Some(message) = error_message(&payload) {
        return Err(EngineError::Upstream(message));
    }
    if !payload.get("data").map(Value::is_array).unwrap_or(false) {
        return Err(EngineError::malformed(
            "together response missing data array",
            &payload.to_string(),
        ));
    }
    Ok(payload)
}

#[async_trait]
impl ImageProvider for TogetherProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Together
    }

    fn mode(&self) -> SubmitMode {
        SubmitMode::Batch
    }

    fn max_images(&self) -> u32 {
        self.settings.max_images.max(1)
    }

    #[instrument(skip_all, fields(model = %request.model, count = request.count))]
    async fn submit(&self, request: &ImageRequest) -> Result<Submission, EngineError> {
        if request.prompt.trim().is_empty() {
            return Err(EngineError::Validation("missing prompt".into()));
        }
        let key = self.settings.api_key.trim();
        if key.is_empty() {
            return Err(EngineError::Config("together.api_key is not configured".into()));
        }

        let body = self.build_body(request);
        if body["n"].as_u64() != Some(u64::from(request.count)) {
            warn!(requested = request.count, sent = %body["n"], "image count clamped to provider limit");
        }
        let url = endpoint(&self.settings.api_base, "images/generations")?;
        debug!(url = %url, model = %body["model"], "requesting image batch");
        let response = self.http.post(url).bearer_auth(key).json(&body).send().await?;
        let payload = check_batch(read_json("together", response).await?)?;
        info!(
            returned = payload["data"].as_array().map(Vec::len).unwrap_or(0),
            "image batch received"
        );
        Ok(Submission::Completed(payload))
    }
}
