//! Video provider traits.

use crate::error::Result;
use crate::video::poller::JobPoller;
use crate::video::types::{
    Artifact, CompletedJob, GenerationRequest, JobHandle, JobStatus, ProviderId,
};
use async_trait::async_trait;
use std::time::Duration;

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default absolute ceiling on one job, independent of vendor progress.
pub const DEFAULT_JOB_CEILING: Duration = Duration::from_secs(600);

/// Polling parameters for one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between polls.
    pub interval: Duration,
    /// Maximum total wait.
    pub ceiling: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            ceiling: DEFAULT_JOB_CEILING,
        }
    }
}

/// What the failover orchestrator calls: one logical generation that only
/// returns once the job is terminal.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> ProviderId;

    /// Returns the display name of this provider.
    fn name(&self) -> &str {
        self.id().descriptor().name
    }

    /// Submits, waits for a terminal state and resolves the artifact.
    async fn generate(&self, request: &GenerationRequest, key: &str) -> Result<CompletedJob>;
}

/// A vendor exposing asynchronous jobs (submit, then poll, then fetch).
///
/// Every `JobProvider` is a [`VideoProvider`]; the generic [`JobPoller`]
/// drives the job to a terminal state.
#[async_trait]
pub trait JobProvider: Send + Sync {
    /// Returns the provider identifier.
    fn provider_id(&self) -> ProviderId;

    /// Polling interval and ceiling for this vendor.
    fn poll_config(&self) -> PollConfig {
        PollConfig::default()
    }

    /// Clip length the vendor will actually produce for this request.
    fn clip_duration(&self, request: &GenerationRequest) -> u32 {
        request.duration_secs
    }

    /// Submits a job. Fatal conditions (bad key, invalid request) are errors.
    async fn submit(&self, request: &GenerationRequest, key: &str) -> Result<JobHandle>;

    /// Polls the job once and maps the vendor status onto [`JobStatus`].
    async fn poll(&self, handle: &JobHandle, key: &str) -> Result<JobStatus>;

    /// Resolves the artifact of a succeeded job. `None` means the vendor
    /// reported success without a usable output.
    async fn fetch(&self, handle: &JobHandle, key: &str) -> Result<Option<Artifact>>;
}

#[async_trait]
impl<T: JobProvider> VideoProvider for T {
    fn id(&self) -> ProviderId {
        self.provider_id()
    }

    async fn generate(&self, request: &GenerationRequest, key: &str) -> Result<CompletedJob> {
        let handle = self.submit(request, key).await?;
        tracing::debug!(
            provider = %handle.provider,
            job_id = %handle.vendor_job_id,
            "submitted video generation job"
        );

        let artifact = JobPoller::new(self.poll_config())
            .run(self, &handle, key)
            .await?;

        Ok(CompletedJob {
            handle,
            artifact,
            duration_secs: self.clip_duration(request),
        })
    }
}
