use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{normalize, ImageProvider};
use crate::model::{ImageJob, JobStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const TIMEOUT_REASON: &str = "generation timed out";

/// Drives a poll-style job to a terminal state.
///
/// Checks are strictly sequential: sleep, check, and only then decide whether
/// to go again. There is no wall-clock deadline; the worst case is roughly
/// `max_attempts * interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPoller {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl JobPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Poll until the job is terminal or the attempt ceiling is reached. A
    /// job still in flight at the ceiling comes back `failed` with
    /// [`TIMEOUT_REASON`]. A failed status check also ends the job as `failed`.
    #[instrument(skip_all, fields(job_id = %job.id, provider = %job.provider))]
    pub async fn poll(&self, provider: &dyn ImageProvider, mut job: ImageJob) -> ImageJob {
        while !job.status.is_terminal() && job.attempts < self.max_attempts {
            tokio::time::sleep(self.interval).await;
            job.attempts += 1;
            match provider.status(&job.id).await {
                Ok(snapshot) => {
                    debug!(attempt = job.attempts, status = snapshot.status.as_str(), "status check");
                    job.status = snapshot.status;
                    job.output = snapshot.output.as_ref().map(normalize);
                    job.error = snapshot.error;
                }
                Err(err) => {
                    warn!(?err, attempt = job.attempts, "status check failed");
                    job.status = JobStatus::Failed;
                    job.error = Some(err.to_string());
                }
            }
        }

        if !job.status.is_terminal() {
            warn!(attempts = job.attempts, "polling budget exhausted");
            job.status = JobStatus::Failed;
            job.error = Some(TIMEOUT_REASON.to_string());
        }
        job
    }
}
