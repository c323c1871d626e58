//! Predict-and-poll provider speaking the Replicate predictions API.
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{normalize, ImageProvider, ImageRequest, JobSnapshot, SubmitMode, Submission};
use crate::error::EngineError;
use crate::model::{ImageJob, JobStatus, ProviderKind};
use crate::transport::{endpoint, error_message, http_client, read_json};

pub const REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_REPLICATE_MODEL: &str = "sdxl";

/// A model the poll-style provider knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicateModel {
    pub key: &'static str,
    pub model: &'static str,
    /// Pinned version id; unversioned models are addressed by name.
    pub version: Option<&'static str>,
    /// The model runs on a third-party account and needs its key in the input.
    pub needs_openai_key: bool,
}

pub const MODELS: &[ReplicateModel] = &[
    ReplicateModel {
        key: "sdxl",
        model: "stability-ai/sdxl",
        version: Some("39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b"),
        needs_openai_key: false,
    },
    ReplicateModel {
        key: "flux-schnell",
        model: "black-forest-labs/flux-schnell",
        version: None,
        needs_openai_key: false,
    },
    ReplicateModel {
        key: "gpt-image-1",
        model: "openai/gpt-image-1",
        version: None,
        needs_openai_key: true,
    },
];

fn lookup(key: &str) -> Option<&'static ReplicateModel> {
    let key = key.trim();
    MODELS
        .iter()
        .find(|m| m.key.eq_ignore_ascii_case(key) || m.model.eq_ignore_ascii_case(key))
}

/// Resolve a model key. Unknown keys fall back to `default_key`, and an
/// unknown default falls back to SDXL.
pub fn resolve_model(requested: &str, default_key: &str) -> &'static ReplicateModel {
    lookup(requested)
        .or_else(|| lookup(default_key))
        .unwrap_or(&MODELS[0])
}

#[derive(Clone)]
pub struct ReplicateSettings {
    pub api_base: String,
    pub api_token: String,
    pub default_model: String,
    pub openai_api_key: Option<String>,
    /// Most jobs started for one request; each job renders one image.
    pub max_images: u32,
    pub timeout: Duration,
}

impl Default for ReplicateSettings {
    fn default() -> Self {
        Self {
            api_base: REPLICATE_API_BASE.to_string(),
            api_token: String::new(),
            default_model: DEFAULT_REPLICATE_MODEL.to_string(),
            openai_api_key: None,
            max_images: 4,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct ReplicateProvider {
    http: Client,
    settings: ReplicateSettings,
}

impl fmt::Debug for ReplicateProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicateProvider")
            .field("api_base", &self.settings.api_base)
            .field("default_model", &self.settings.default_model)
            .finish_non_exhaustive()
    }
}

/// Build the prediction body for one image.
pub fn build_prediction_body(
    model: &ReplicateModel,
    request: &ImageRequest,
    openai_api_key: Option<&str>,
) -> Result<Value, EngineError> {
    let mut input = Map::new();
    input.insert("prompt".into(), json!(request.prompt.trim()));
    if let Some(width) = request.options.width {
        input.insert("width".into(), json!(width));
    }
    if let Some(height) = request.options.height {
        input.insert("height".into(), json!(height));
    }
    if model.needs_openai_key {
        let key = openai_api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                EngineError::Config(format!(
                    "model {} requires replicate.openai_api_key",
                    model.key
                ))
            })?;
        input.insert("openai_api_key".into(), json!(key));
    }

    let mut body = Map::new();
    match model.version {
        Some(version) => body.insert("version".into(), json!(version)),
        None => body.insert("model".into(), json!(model.model)),
    };
    body.insert("input".into(), Value::Object(input));
    Ok(Value::Object(body))
}

/// Read a prediction payload into a job record.
pub fn parse_prediction(payload: &Value, model: &str) -> Result<ImageJob, EngineError> {
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::malformed("replicate prediction missing id", &payload.to_string()))?;
    let snapshot = parse_snapshot(payload);
    let mut job = ImageJob::new(id, ProviderKind::Replicate, model);
    job.status = snapshot.status;
    job.output = snapshot.output.as_ref().map(normalize);
    job.error = snapshot.error;
    Ok(job)
}

pub fn parse_snapshot(payload: &Value) -> JobSnapshot {
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .map(JobStatus::parse_status)
        .unwrap_or(JobStatus::Running);
    JobSnapshot {
        status,
        output: payload.get("output").filter(|v| !v.is_null()).cloned(),
        error: error_message(payload),
    }
}

impl ReplicateProvider {
    pub fn new(settings: ReplicateSettings) -> Result<Self, EngineError> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            settings,
        })
    }

    fn token(&self) -> Result<&str, EngineError> {
        let token = self.settings.api_token.trim();
        if token.is_empty() {
            return Err(EngineError::Config("replicate.api_token is not configured".into()));
        }
        Ok(token)
    }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }

    fn mode(&self) -> SubmitMode {
        SubmitMode::Poll
    }

    fn max_images(&self) -> u32 {
        self.settings.max_images.max(1)
    }

    #[instrument(skip_all, fields(model = %request.model))]
    async fn submit(&self, request: &ImageRequest) -> Result<Submission, EngineError> {
        if request.prompt.trim().is_empty() {
            return Err(EngineError::Validation("missing prompt".into()));
        }
        let token = self.token()?;
        let model = resolve_model(&request.model, &self.settings.default_model);
        if !model.key.eq_ignore_ascii_case(request.model.trim())
            && !model.model.eq_ignore_ascii_case(request.model.trim())
        {
            info!(requested = %request.model, using = model.key, "unknown model; using default");
        }

        let body = build_prediction_body(model, request, self.settings.openai_api_key.as_deref())?;
        let url = endpoint(&self.settings.api_base, "predictions")?;
        debug!(url = %url, model = model.key, "creating prediction");
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let payload = read_json("replicate", response).await?;
        if let Some(message) = error_message(&payload) {
            return Err(EngineError::Upstream(message));
        }
        let job = parse_prediction(&payload, model.key)?;
        info!(job_id = %job.id, status = job.status.as_str(), "prediction created");
        Ok(Submission::Job(job))
    }

    async fn status(&self, job_id: &str) -> Result<JobSnapshot, EngineError> {
        let token = self.token()?;
        let url = endpoint(&self.settings.api_base, &format!("predictions/{job_id}"))?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let payload = read_json("replicate", response).await?;
        Ok(parse_snapshot(&payload))
    }
}
