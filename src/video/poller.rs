//! Vendor-agnostic polling state machine.
//!
//! `Submitted -> Running -> {Succeeded | Failed | TimedOut}`. Adapters only
//! supply the interval, the ceiling and the status mapping.

use crate::error::{ReelGenError, Result};
use crate::video::provider::{JobProvider, PollConfig};
use crate::video::types::{Artifact, JobHandle, JobStatus};
use std::time::Duration;
use tokio::time::Instant;

/// Vendor status vocabulary for the terminal states. Anything else is
/// treated as still running.
#[derive(Debug, Clone, Copy)]
pub struct StatusTable {
    /// Strings meaning the job succeeded.
    pub succeeded: &'static [&'static str],
    /// Strings meaning the job failed.
    pub failed: &'static [&'static str],
}

impl StatusTable {
    /// Maps a raw vendor status. Comparison ignores ASCII case.
    ///
    /// Unknown strings map to `Running` so that new in-progress states
    /// introduced by a vendor keep the job alive.
    pub fn map(&self, raw: &str, failure_reason: impl FnOnce() -> String) -> JobStatus {
        let raw = raw.trim();
        if self.succeeded.iter().any(|s| s.eq_ignore_ascii_case(raw)) {
            JobStatus::Succeeded
        } else if self.failed.iter().any(|s| s.eq_ignore_ascii_case(raw)) {
            JobStatus::Failed(failure_reason())
        } else {
            JobStatus::Running
        }
    }
}

/// Terminal status plus bookkeeping from one polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Terminal status.
    pub status: JobStatus,
    /// Number of `poll` calls made.
    pub polls: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

/// Bounded polling loop.
#[derive(Debug, Clone, Copy)]
pub struct JobPoller {
    config: PollConfig,
}

impl JobPoller {
    /// Creates a poller with the given interval and ceiling.
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Polls until the job is terminal or the ceiling is exceeded.
    ///
    /// Transient poll errors (network, 5xx) are logged and polling continues
    /// against the same ceiling; any other error ends the run.
    pub async fn wait_for_terminal<P>(
        &self,
        provider: &P,
        handle: &JobHandle,
        key: &str,
    ) -> Result<PollReport>
    where
        P: JobProvider + ?Sized,
    {
        let start = Instant::now();
        let mut polls = 0u32;

        loop {
            polls += 1;
            match provider.poll(handle, key).await {
                Ok(status) if status.is_terminal() => {
                    return Ok(PollReport {
                        status,
                        polls,
                        elapsed: start.elapsed(),
                    });
                }
                Ok(_) => {
                    tracing::debug!(
                        provider = %handle.provider,
                        job_id = %handle.vendor_job_id,
                        polls,
                        elapsed_secs = start.elapsed().as_secs(),
                        "job still running"
                    );
                }
                Err(e) if e.is_retryable() => {
                    tracing::debug!(
                        provider = %handle.provider,
                        job_id = %handle.vendor_job_id,
                        polls,
                        "transient poll error, continuing: {e}"
                    );
                }
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.config.ceiling {
                return Ok(PollReport {
                    status: JobStatus::TimedOut,
                    polls,
                    elapsed,
                });
            }

            let remaining = self.config.ceiling - elapsed;
            tokio::time::sleep(self.config.interval.min(remaining)).await;
        }
    }

    /// Drives the job to a terminal state and resolves its artifact.
    ///
    /// `Succeeded` without a resolvable artifact is `ArtifactMissing`,
    /// vendor failure is `JobFailed` and the ceiling is `TimedOut`.
    pub async fn run<P>(&self, provider: &P, handle: &JobHandle, key: &str) -> Result<Artifact>
    where
        P: JobProvider + ?Sized,
    {
        let report = self.wait_for_terminal(provider, handle, key).await?;

        match report.status {
            JobStatus::Succeeded => provider.fetch(handle, key).await?.ok_or_else(|| {
                ReelGenError::ArtifactMissing(format!(
                    "{} job {} succeeded without an output",
                    handle.provider, handle.vendor_job_id
                ))
            }),
            JobStatus::Failed(reason) => Err(ReelGenError::JobFailed(reason)),
            JobStatus::TimedOut | JobStatus::Running => {
                Err(ReelGenError::TimedOut(self.config.ceiling))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedJob;
    use crate::video::types::ProviderId;

    const TABLE: StatusTable = StatusTable {
        succeeded: &["succeeded"],
        failed: &["failed", "canceled"],
    };

    fn fast() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(100),
            ceiling: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_status_table_mapping() {
        assert_eq!(TABLE.map("SUCCEEDED", String::new), JobStatus::Succeeded);
        assert_eq!(
            TABLE.map("canceled", || "user canceled".into()),
            JobStatus::Failed("user canceled".into())
        );
        assert_eq!(TABLE.map("processing", String::new), JobStatus::Running);
        assert_eq!(TABLE.map("some_new_state", String::new), JobStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_exact_poll_count() {
        let job = ScriptedJob::new(ProviderId::Replicate)
            .with_statuses(&["queued", "processing", "processing", "succeeded"])
            .with_poll_config(fast());
        let handle = JobHandle::new(ProviderId::Replicate, "pred-1");

        let report = JobPoller::new(fast())
            .wait_for_terminal(&job, &handle, "r8_key")
            .await
            .unwrap();
        assert_eq!(report.status, JobStatus::Succeeded);
        assert_eq!(report.polls, 4);
        assert_eq!(job.poll_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_keeps_polling() {
        let job = ScriptedJob::new(ProviderId::Replicate)
            .with_statuses(&["warming_up", "rendering_frames", "succeeded"])
            .with_poll_config(fast());
        let handle = JobHandle::new(ProviderId::Replicate, "pred-2");

        let artifact = JobPoller::new(fast()).run(&job, &handle, "k").await.unwrap();
        assert_eq!(job.poll_calls(), 3);
        assert!(matches!(artifact.source, crate::video::ArtifactSource::Bytes { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_reports_timed_out_not_failed() {
        let job = ScriptedJob::new(ProviderId::Luma)
            .with_statuses(&["dreaming"])
            .with_poll_config(fast());
        let handle = JobHandle::new(ProviderId::Luma, "gen-1");

        let start = Instant::now();
        let err = JobPoller::new(fast()).run(&job, &handle, "k").await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, ReelGenError::TimedOut(d) if d == Duration::from_millis(500)));
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(600));
        assert!((5..=6).contains(&job.poll_calls()), "polls: {}", job.poll_calls());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vendor_failure_is_job_failed() {
        let job = ScriptedJob::new(ProviderId::Replicate)
            .with_statuses(&["processing", "failed"])
            .with_poll_config(fast());
        let handle = JobHandle::new(ProviderId::Replicate, "pred-3");

        let err = JobPoller::new(fast()).run(&job, &handle, "k").await.unwrap_err();
        assert!(matches!(err, ReelGenError::JobFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_without_artifact_is_artifact_missing() {
        let job = ScriptedJob::new(ProviderId::Fal)
            .with_statuses(&["succeeded"])
            .without_artifact()
            .with_poll_config(fast());
        let handle = JobHandle::new(ProviderId::Fal, "req-1");

        let err = JobPoller::new(fast()).run(&job, &handle, "k").await.unwrap_err();
        assert!(matches!(err, ReelGenError::ArtifactMissing(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_poll_error_is_tolerated() {
        let job = ScriptedJob::new(ProviderId::Runway)
            .with_statuses(&["!transient", "running", "succeeded"])
            .with_poll_config(fast());
        let handle = JobHandle::new(ProviderId::Runway, "task-1");

        let report = JobPoller::new(fast())
            .wait_for_terminal(&job, &handle, "k")
            .await
            .unwrap();
        assert_eq!(report.status, JobStatus::Succeeded);
        assert_eq!(report.polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_poll_error_ends_run() {
        let job = ScriptedJob::new(ProviderId::Runway)
            .with_statuses(&["!credential"])
            .with_poll_config(fast());
        let handle = JobHandle::new(ProviderId::Runway, "task-2");

        let err = JobPoller::new(fast())
            .wait_for_terminal(&job, &handle, "k")
            .await
            .unwrap_err();
        assert!(matches!(err, ReelGenError::Credential(_)));
        assert_eq!(job.poll_calls(), 1);
    }
}
