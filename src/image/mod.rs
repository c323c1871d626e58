//! Image generation: provider adapters, the job poller, response
//! normalisation and the orchestrator that composes them.
use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;
use crate::model::{ImageJob, JobStatus, ProviderKind};

pub mod normalize;
pub mod orchestrator;
pub mod poller;
pub mod replicate;
pub mod together;

pub use normalize::normalize;
pub use orchestrator::VisualGenerationOrchestrator;
pub use poller::JobPoller;
pub use replicate::ReplicateProvider;
pub use together::TogetherProvider;

/// How a provider delivers results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Submission yields a job id; results come from repeated status checks.
    /// One job renders one image.
    Poll,
    /// Submission returns the final images for the whole batch.
    Batch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub steps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub count: u32,
    pub options: ImageOptions,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, count: u32) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            count,
            options: ImageOptions::default(),
        }
    }
}

/// What a provider hands back from a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// A job to drive through the poller. It may already be terminal.
    Job(ImageJob),
    /// Final provider payload, ready for normalisation.
    Completed(Value),
}

/// Current state of a poll-style job as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn mode(&self) -> SubmitMode;

    /// Most images one `generate` call may ask of this provider. Poll-style
    /// fan-out is clamped to it; batch providers clamp their own `n`.
    fn max_images(&self) -> u32 {
        u32::MAX
    }

    async fn submit(&self, request: &ImageRequest) -> Result<Submission, EngineError>;

    /// Fetch the current state of a job. Batch providers have nothing to poll.
    async fn status(&self, job_id: &str) -> Result<JobSnapshot, EngineError> {
        Err(EngineError::Config(format!(
            "{} does not support status checks (job {job_id})",
            self.kind()
        )))
    }
}
