//! Runway ML (Gen-4) video generation provider.

use crate::error::Result;
use crate::video::normalize::normalize_response;
use crate::video::poller::StatusTable;
use crate::video::provider::{JobProvider, PollConfig, DEFAULT_JOB_CEILING, DEFAULT_POLL_INTERVAL};
use crate::video::providers::{check_status, endpoint};
use crate::video::types::{
    Artifact, AspectRatio, GenerationRequest, JobHandle, JobStatus, ProviderId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.dev.runwayml.com/v1";
const API_VERSION: &str = "2024-11-06";
const MODEL: &str = "gen4_turbo";
const MAX_DURATION_SECS: u32 = 10;

const STATUS: StatusTable = StatusTable {
    succeeded: &["SUCCEEDED"],
    failed: &["FAILED", "CANCELLED"],
};

/// Builder for [`RunwayProvider`].
#[derive(Debug, Clone)]
pub struct RunwayProviderBuilder {
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for RunwayProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_CEILING,
        }
    }
}

impl RunwayProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for a task.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> RunwayProvider {
        RunwayProvider {
            client: reqwest::Client::new(),
            base_url: self.base_url,
            poll: PollConfig {
                interval: self.poll_interval,
                ceiling: self.timeout,
            },
        }
    }
}

/// Runway ML task-based video generation.
#[derive(Debug)]
pub struct RunwayProvider {
    client: reqwest::Client,
    base_url: String,
    poll: PollConfig,
}

impl RunwayProvider {
    /// Creates a new [`RunwayProviderBuilder`].
    pub fn builder() -> RunwayProviderBuilder {
        RunwayProviderBuilder::new()
    }

    async fn get_task(&self, handle: &JobHandle, key: &str) -> Result<(reqwest::Response, reqwest::Url)> {
        let url = endpoint(&self.base_url, &format!("tasks/{}", handle.vendor_job_id))?;
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(key)
            .header("X-Runway-Version", API_VERSION)
            .send()
            .await?;
        Ok((check_status(response).await?, url))
    }
}

#[async_trait]
impl JobProvider for RunwayProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Runway
    }

    fn poll_config(&self) -> PollConfig {
        self.poll
    }

    fn clip_duration(&self, request: &GenerationRequest) -> u32 {
        request.duration_capped(MAX_DURATION_SECS)
    }

    async fn submit(&self, request: &GenerationRequest, key: &str) -> Result<JobHandle> {
        let path = if request.reference_image_url.is_some() {
            "image_to_video"
        } else {
            "text_to_video"
        };
        let url = endpoint(&self.base_url, path)?;
        let body = RunwayRequest::from_request(request);

        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .header("X-Runway-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        let task: RunwayTaskCreated = check_status(response).await?.json().await?;

        Ok(JobHandle::new(ProviderId::Runway, task.id))
    }

    async fn poll(&self, handle: &JobHandle, key: &str) -> Result<JobStatus> {
        let (response, _) = self.get_task(handle, key).await?;
        let task: RunwayTask = response.json().await?;

        tracing::debug!(
            job_id = %handle.vendor_job_id,
            status = %task.status,
            progress = task.progress.unwrap_or_default(),
            "polled Runway task"
        );
        Ok(STATUS.map(&task.status, || {
            task.failure
                .clone()
                .unwrap_or_else(|| "Runway task failed".into())
        }))
    }

    async fn fetch(&self, handle: &JobHandle, key: &str) -> Result<Option<Artifact>> {
        let (response, url) = self.get_task(handle, key).await?;
        Ok(normalize_response(response, &url, &["artifactUrl"])
            .await?
            .into_artifact())
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunwayRequest {
    model: &'static str,
    prompt_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_image: Option<String>,
    ratio: &'static str,
    duration: u32,
}

impl RunwayRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let ratio = match req.aspect_ratio {
            AspectRatio::Portrait => "720:1280",
            AspectRatio::Square => "960:960",
            AspectRatio::Landscape => "1280:720",
        };
        Self {
            model: MODEL,
            prompt_text: req.prompt.clone(),
            prompt_image: req.reference_image_url.clone(),
            ratio,
            duration: req.duration_capped(MAX_DURATION_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunwayTaskCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunwayTask {
    status: String,
    #[serde(default)]
    failure: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
}
