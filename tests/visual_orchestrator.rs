use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use visual_engine::image::{
    ImageProvider, ImageRequest, JobPoller, JobSnapshot, SubmitMode, Submission,
    VisualGenerationOrchestrator,
};
use visual_engine::model::{GeneratedImage, ImageJob, JobStatus, ProviderKind};
use visual_engine::{EngineError, FailureKind};

/// How the fake poll provider treats the next submission.
#[derive(Clone)]
enum FakeJob {
    Succeed(&'static str),
    Fail(Option<&'static str>),
    SucceedEmpty,
    Hang,
    RejectSubmit(EngineError),
}

struct FakePoll {
    outcomes: Mutex<VecDeque<FakeJob>>,
    submits: Mutex<Vec<ImageRequest>>,
    jobs: Mutex<HashMap<String, FakeJob>>,
    max_images: u32,
}

impl FakePoll {
    fn new(outcomes: Vec<FakeJob>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::from(outcomes)),
            submits: Mutex::new(Vec::new()),
            jobs: Mutex::new(HashMap::new()),
            max_images: u32::MAX,
        })
    }

    fn capped(max_images: u32) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            submits: Mutex::new(Vec::new()),
            jobs: Mutex::new(HashMap::new()),
            max_images,
        })
    }

    async fn submit_count(&self) -> usize {
        self.submits.lock().await.len()
    }
}

#[async_trait]
impl ImageProvider for FakePoll {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }

    fn mode(&self) -> SubmitMode {
        SubmitMode::Poll
    }

    fn max_images(&self) -> u32 {
        self.max_images
    }

    async fn submit(&self, request: &ImageRequest) -> Result<Submission, EngineError> {
        let mut submits = self.submits.lock().await;
        submits.push(request.clone());
        let id = format!("job-{}", submits.len());
        drop(submits);

        let next = self
            .outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or(FakeJob::Succeed("https://img/default.png"));
        let next = match next {
            FakeJob::RejectSubmit(err) => return Err(err),
            other => other,
        };
        self.jobs.lock().await.insert(id.clone(), next);
        Ok(Submission::Job(ImageJob::new(id, ProviderKind::Replicate, request.model.clone())))
    }

    async fn status(&self, job_id: &str) -> Result<JobSnapshot, EngineError> {
        let job = self.jobs.lock().await.get(job_id).cloned();
        let snapshot = match job {
            Some(FakeJob::Succeed(url)) => JobSnapshot {
                status: JobStatus::Succeeded,
                output: Some(json!([url])),
                error: None,
            },
            Some(FakeJob::SucceedEmpty) => JobSnapshot {
                status: JobStatus::Succeeded,
                output: Some(json!([])),
                error: None,
            },
            Some(FakeJob::Fail(reason)) => JobSnapshot {
                status: JobStatus::Failed,
                output: None,
                error: reason.map(String::from),
            },
            _ => JobSnapshot {
                status: JobStatus::Running,
                output: None,
                error: None,
            },
        };
        Ok(snapshot)
    }
}

struct FakeBatch {
    payload: Value,
    calls: Mutex<Vec<ImageRequest>>,
}

impl FakeBatch {
    fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ImageProvider for FakeBatch {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Together
    }

    fn mode(&self) -> SubmitMode {
        SubmitMode::Batch
    }

    async fn submit(&self, request: &ImageRequest) -> Result<Submission, EngineError> {
        self.calls.lock().await.push(request.clone());
        Ok(Submission::Completed(self.payload.clone()))
    }
}

fn orchestrator(provider: Arc<dyn ImageProvider>, max_attempts: u32) -> VisualGenerationOrchestrator {
    VisualGenerationOrchestrator::new(JobPoller::new(Duration::ZERO, max_attempts))
        .with_provider(provider)
}

#[tokio::test]
async fn poll_provider_fans_out_one_job_per_image() {
    let fake = FakePoll::new(vec![
        FakeJob::Succeed("https://img/1.png"),
        FakeJob::Succeed("https://img/2.png"),
        FakeJob::Succeed("https://img/3.png"),
    ]);
    let images = orchestrator(fake.clone(), 5)
        .generate("a lighthouse at dusk", ProviderKind::Replicate, "sdxl", 3)
        .await
        .unwrap();

    assert_eq!(images.len(), 3);
    let submits = fake.submits.lock().await;
    assert_eq!(submits.len(), 3);
    assert!(submits.iter().all(|r| r.count == 1 && r.model == "sdxl"));
}

#[tokio::test]
async fn poll_fan_out_is_clamped_to_provider_limit() {
    let fake = FakePoll::capped(2);
    let images = orchestrator(fake.clone(), 5)
        .generate("p", ProviderKind::Replicate, "sdxl", 100_000)
        .await
        .unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(fake.submit_count().await, 2);
}

#[tokio::test]
async fn partial_failure_returns_the_images_that_succeeded() {
    let fake = FakePoll::new(vec![
        FakeJob::Succeed("https://img/ok.png"),
        FakeJob::Fail(Some("NSFW content detected")),
    ]);
    let images = orchestrator(fake, 5)
        .generate("p", ProviderKind::Replicate, "sdxl", 2)
        .await
        .unwrap();
    assert_eq!(images, vec![GeneratedImage::Url("https://img/ok.png".into())]);
}

#[tokio::test]
async fn provider_failure_message_is_surfaced_verbatim() {
    let fake = FakePoll::new(vec![FakeJob::Fail(Some("CUDA out of memory"))]);
    let failure = orchestrator(fake, 5)
        .generate("p", ProviderKind::Replicate, "sdxl", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::JobFailed);
    assert_eq!(failure.reason, "CUDA out of memory");
    assert_eq!(failure.provider, ProviderKind::Replicate);
    assert_eq!(failure.model, "sdxl");
    assert_eq!(failure.count, 1);
}

#[tokio::test]
async fn failure_without_message_gets_generic_reason() {
    let fake = FakePoll::new(vec![FakeJob::Fail(None)]);
    let failure = orchestrator(fake, 5)
        .generate("p", ProviderKind::Replicate, "sdxl", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::JobFailed);
    assert_eq!(failure.reason, "generation failed");
}

#[tokio::test]
async fn hanging_job_times_out() {
    let fake = FakePoll::new(vec![FakeJob::Hang]);
    let failure = orchestrator(fake, 3)
        .generate("p", ProviderKind::Replicate, "sdxl", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.reason, "generation timed out");
}

#[tokio::test]
async fn succeeded_job_without_output_is_no_image() {
    let fake = FakePoll::new(vec![FakeJob::SucceedEmpty]);
    let failure = orchestrator(fake, 3)
        .generate("p", ProviderKind::Replicate, "sdxl", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::NoImage);
}

#[tokio::test]
async fn rejected_submission_keeps_error_kind() {
    let fake = FakePoll::new(vec![FakeJob::RejectSubmit(EngineError::Upstream(
        "replicate error 422: invalid version".into(),
    ))]);
    let failure = orchestrator(fake, 3)
        .generate("p", ProviderKind::Replicate, "sdxl", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Upstream);
    assert_eq!(failure.reason, "replicate error 422: invalid version");
}

#[tokio::test]
async fn invalid_input_never_reaches_provider() {
    let fake = FakePoll::new(vec![]);
    let engine = orchestrator(fake.clone(), 3);

    let failure = engine
        .generate("   ", ProviderKind::Replicate, "sdxl", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Validation);
    assert_eq!(failure.reason, "missing prompt");

    let failure = engine
        .generate("p", ProviderKind::Replicate, "sdxl", 0)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Validation);

    assert_eq!(fake.submit_count().await, 0);
}

#[tokio::test]
async fn unregistered_provider_is_config_failure() {
    let failure = orchestrator(FakePoll::new(vec![]), 3)
        .generate("p", ProviderKind::Together, "flux", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Config);
    assert_eq!(failure.provider, ProviderKind::Together);
}

#[tokio::test]
async fn batch_provider_is_called_once_and_may_return_fewer() {
    let fake = FakeBatch::new(json!({"data": [{"b64_json": "abc"}, {"url": "https://t/2.png"}]}));
    let images = orchestrator(fake.clone(), 3)
        .generate("p", ProviderKind::Together, "flux", 4)
        .await
        .unwrap();
    assert_eq!(
        images,
        vec![
            GeneratedImage::Base64("abc".into()),
            GeneratedImage::Url("https://t/2.png".into()),
        ]
    );
    let calls = fake.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].count, 4);
}

#[tokio::test]
async fn batch_with_unrecognised_payload_is_no_image() {
    let fake = FakeBatch::new(json!({"data": [{"revised_prompt": "x"}]}));
    let failure = orchestrator(fake, 3)
        .generate("p", ProviderKind::Together, "flux", 1)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::NoImage);
    assert_eq!(failure.reason, "no image returned");
}
