//! Sora (OpenAI) video generation provider.

use crate::error::Result;
use crate::video::normalize::normalize_response;
use crate::video::poller::StatusTable;
use crate::video::provider::{JobProvider, PollConfig, DEFAULT_JOB_CEILING, DEFAULT_POLL_INTERVAL};
use crate::video::providers::{check_status, endpoint};
use crate::video::types::{
    Artifact, AspectRatio, GenerationRequest, JobHandle, JobStatus, ProviderId, Resolution,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.openai.com/v1";

const STATUS: StatusTable = StatusTable {
    succeeded: &["completed"],
    failed: &["failed"],
};

/// Sora model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoraModel {
    /// Sora 2.
    #[default]
    Sora2,
    /// Sora 2 Pro, higher fidelity and slower.
    Sora2Pro,
}

impl SoraModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sora2 => "sora-2",
            Self::Sora2Pro => "sora-2-pro",
        }
    }
}

/// Builder for [`SoraProvider`].
#[derive(Debug, Clone)]
pub struct SoraProviderBuilder {
    base_url: String,
    model: SoraModel,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for SoraProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            model: SoraModel::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_CEILING,
        }
    }
}

impl SoraProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the Sora model variant.
    pub fn model(mut self, model: SoraModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the polling interval for async generation.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for generation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> SoraProvider {
        SoraProvider {
            client: reqwest::Client::new(),
            base_url: self.base_url,
            model: self.model,
            poll: PollConfig {
                interval: self.poll_interval,
                ceiling: self.timeout,
            },
        }
    }
}

/// Sora video generation provider.
#[derive(Debug)]
pub struct SoraProvider {
    client: reqwest::Client,
    base_url: String,
    model: SoraModel,
    poll: PollConfig,
}

impl SoraProvider {
    /// Creates a new [`SoraProviderBuilder`].
    pub fn builder() -> SoraProviderBuilder {
        SoraProviderBuilder::new()
    }
}

#[async_trait]
impl JobProvider for SoraProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn poll_config(&self) -> PollConfig {
        self.poll
    }

    fn clip_duration(&self, request: &GenerationRequest) -> u32 {
        nearest_seconds(request.duration_secs)
    }

    async fn submit(&self, request: &GenerationRequest, key: &str) -> Result<JobHandle> {
        if request.reference_image_url.is_some() {
            tracing::debug!("Sora ignores the reference image");
        }
        let body = SoraRequest::from_request(request, self.model);

        let response = self
            .client
            .post(endpoint(&self.base_url, "videos")?)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let submitted: SoraSubmitResponse = check_status(response).await?.json().await?;

        Ok(JobHandle::new(ProviderId::OpenAi, submitted.id))
    }

    async fn poll(&self, handle: &JobHandle, key: &str) -> Result<JobStatus> {
        let url = endpoint(&self.base_url, &format!("videos/{}", handle.vendor_job_id))?;
        let response = self.client.get(url).bearer_auth(key).send().await?;
        let polled: SoraPollResponse = check_status(response).await?.json().await?;

        tracing::debug!(
            video_id = %handle.vendor_job_id,
            status = %polled.status,
            progress = polled.progress,
            "polling Sora video generation"
        );
        Ok(STATUS.map(&polled.status, || {
            polled
                .error
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_else(|| "Sora generation failed".into())
        }))
    }

    async fn fetch(&self, handle: &JobHandle, key: &str) -> Result<Option<Artifact>> {
        let url = endpoint(
            &self.base_url,
            &format!("videos/{}/content", handle.vendor_job_id),
        )?;
        let response = self.client.get(url.clone()).bearer_auth(key).send().await?;
        let response = check_status(response).await?;
        Ok(normalize_response(response, &url, &[]).await?.into_artifact())
    }
}

/// Valid Sora durations in seconds.
const VALID_SECONDS: [u32; 3] = [4, 8, 12];

fn nearest_seconds(duration: u32) -> u32 {
    VALID_SECONDS
        .iter()
        .min_by_key(|&&v| (i64::from(v) - i64::from(duration)).unsigned_abs())
        .copied()
        .unwrap_or(4)
}

fn size_for(aspect: AspectRatio, resolution: Resolution) -> &'static str {
    let hd = resolution == Resolution::FullHd1080;
    match (aspect, hd) {
        (AspectRatio::Portrait, true) => "1024x1792",
        (AspectRatio::Portrait, false) => "720x1280",
        (_, true) => "1792x1024",
        (_, false) => "1280x720",
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct SoraRequest {
    model: &'static str,
    prompt: String,
    size: &'static str,
    /// "4", "8" or "12".
    seconds: String,
}

impl SoraRequest {
    fn from_request(req: &GenerationRequest, model: SoraModel) -> Self {
        Self {
            model: model.as_str(),
            prompt: req.prompt.clone(),
            size: size_for(req.aspect_ratio, req.resolution),
            seconds: nearest_seconds(req.duration_secs).to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SoraSubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SoraPollResponse {
    status: String,
    #[serde(default)]
    progress: Option<u32>,
    #[serde(default)]
    error: Option<SoraError>,
}

#[derive(Debug, Deserialize)]
struct SoraError {
    #[serde(default)]
    message: Option<String>,
}
