use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::poller::TIMEOUT_REASON;
use super::{normalize, ImageProvider, ImageRequest, JobPoller, SubmitMode, Submission};
use crate::error::{FailureKind, VisualFailure};
use crate::model::{GeneratedImage, JobStatus, ProviderKind};

const GENERIC_FAILURE: &str = "generation failed";
const NO_IMAGE: &str = "no image returned";

type Attempt = Result<Vec<GeneratedImage>, (FailureKind, String)>;

/// Composes submission, polling and normalisation behind one call.
pub struct VisualGenerationOrchestrator {
    providers: HashMap<ProviderKind, Arc<dyn ImageProvider>>,
    poller: JobPoller,
}

impl VisualGenerationOrchestrator {
    pub fn new(poller: JobPoller) -> Self {
        Self {
            providers: HashMap::new(),
            poller,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub async fn generate(
        &self,
        prompt: &str,
        provider: ProviderKind,
        model: &str,
        count: u32,
    ) -> Result<Vec<GeneratedImage>, VisualFailure> {
        self.generate_request(provider, ImageRequest::new(prompt, model, count))
            .await
    }

    /// Render `request.count` images. Poll-style providers get one job per
    /// image, run concurrently; a failed job does not cancel its siblings and
    /// whatever succeeded is returned. Batch providers get a single call and
    /// may return fewer images than asked for.
    #[instrument(skip_all, fields(provider = %provider, model = %request.model, count = request.count))]
    pub async fn generate_request(
        &self,
        provider: ProviderKind,
        request: ImageRequest,
    ) -> Result<Vec<GeneratedImage>, VisualFailure> {
        let fail = |kind: FailureKind, reason: String| VisualFailure {
            kind,
            reason,
            provider,
            model: request.model.clone(),
            count: request.count,
        };

        if request.prompt.trim().is_empty() {
            return Err(fail(FailureKind::Validation, "missing prompt".into()));
        }
        if request.count == 0 {
            return Err(fail(FailureKind::Validation, "count must be at least 1".into()));
        }
        let Some(adapter) = self.providers.get(&provider) else {
            return Err(fail(
                FailureKind::Config,
                format!("provider {provider} is not configured"),
            ));
        };
        let adapter = adapter.as_ref();

        let attempts: Vec<Attempt> = match adapter.mode() {
            SubmitMode::Poll => {
                let jobs = request.count.min(adapter.max_images());
                if jobs < request.count {
                    warn!(requested = request.count, jobs, "image count clamped to provider limit");
                }
                let single = ImageRequest {
                    count: 1,
                    ..request.clone()
                };
                join_all((0..jobs).map(|_| self.run_one(adapter, &single))).await
            }
            SubmitMode::Batch => vec![self.run_one(adapter, &request).await],
        };

        let mut images = Vec::new();
        let mut failures = Vec::new();
        for attempt in attempts {
            match attempt {
                Ok(batch) => images.extend(batch),
                Err(failure) => failures.push(failure),
            }
        }

        if images.is_empty() {
            let (kind, reason) = failures
                .into_iter()
                .next()
                .unwrap_or((FailureKind::NoImage, NO_IMAGE.to_string()));
            warn!(?kind, %reason, "visual generation failed");
            return Err(fail(kind, reason));
        }
        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                succeeded = images.len(),
                "some image requests failed; returning partial results"
            );
        }
        if images.len() < request.count as usize {
            info!(
                requested = request.count,
                returned = images.len(),
                "fewer images than requested"
            );
        }
        Ok(images)
    }

    async fn run_one(&self, provider: &dyn ImageProvider, request: &ImageRequest) -> Attempt {
        let images = match provider.submit(request).await {
            Err(err) => return Err((err.kind(), err.to_string())),
            Ok(Submission::Completed(payload)) => normalize(&payload),
            Ok(Submission::Job(job)) => {
                let job = self.poller.poll(provider, job).await;
                if job.status != JobStatus::Succeeded {
                    return Err(match job.error {
                        Some(reason) if reason == TIMEOUT_REASON => (FailureKind::Timeout, reason),
                        Some(reason) if !reason.trim().is_empty() => (FailureKind::JobFailed, reason),
                        _ => (FailureKind::JobFailed, GENERIC_FAILURE.to_string()),
                    });
                }
                job.output.unwrap_or_default()
            }
        };
        if images.is_empty() {
            return Err((FailureKind::NoImage, NO_IMAGE.to_string()));
        }
        Ok(images)
    }
}
