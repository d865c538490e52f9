//! Luma AI Dream Machine video generation provider.

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

const BASE_URL: &str = "https://api.lumalabs.ai/dream-machine/v1";

/// Dream Machine clips are always five seconds.
const CLIP_SECS: u32 = 5;

const STATUS: StatusTable = StatusTable {
    succeeded: &["completed"],
    failed: &["failed"],
};

/// Builder for [`LumaProvider`].
#[derive(Debug, Clone)]
pub struct LumaProviderBuilder {
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for LumaProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_CEILING,
        }
    }
}

impl LumaProviderBuilder {
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

    /// Sets the maximum time to wait for generation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> LumaProvider {
        LumaProvider {
            client: reqwest::Client::new(),
            base_url: self.base_url,
            poll: PollConfig {
                interval: self.poll_interval,
                ceiling: self.timeout,
            },
        }
    }
}

/// Luma Dream Machine generations API.
#[derive(Debug)]
pub struct LumaProvider {
    client: reqwest::Client,
    base_url: String,
    poll: PollConfig,
}

impl LumaProvider {
    /// Creates a new [`LumaProviderBuilder`].
    pub fn builder() -> LumaProviderBuilder {
        LumaProviderBuilder::new()
    }

    fn generation_url(&self, handle: &JobHandle) -> Result<reqwest::Url> {
        endpoint(&self.base_url, &format!("generations/{}", handle.vendor_job_id))
    }
}

#[async_trait]
impl JobProvider for LumaProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Luma
    }

    fn poll_config(&self) -> PollConfig {
        self.poll
    }

    fn clip_duration(&self, _request: &GenerationRequest) -> u32 {
        CLIP_SECS
    }

    async fn submit(&self, request: &GenerationRequest, key: &str) -> Result<JobHandle> {
        let body = LumaRequest::from_request(request);

        let response = self
            .client
            .post(endpoint(&self.base_url, "generations")?)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let generation: LumaGeneration = check_status(response).await?.json().await?;

        Ok(JobHandle::new(ProviderId::Luma, generation.id))
    }

    async fn poll(&self, handle: &JobHandle, key: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.generation_url(handle)?)
            .bearer_auth(key)
            .send()
            .await?;
        let generation: LumaGeneration = check_status(response).await?.json().await?;

        tracing::debug!(
            generation_id = %handle.vendor_job_id,
            state = %generation.state,
            "polled Luma generation"
        );
        Ok(STATUS.map(&generation.state, || {
            generation
                .failure_reason
                .clone()
                .unwrap_or_else(|| "Luma generation failed".into())
        }))
    }

    async fn fetch(&self, handle: &JobHandle, key: &str) -> Result<Option<Artifact>> {
        let url = self.generation_url(handle)?;
        let response = self.client.get(url.clone()).bearer_auth(key).send().await?;
        let response = check_status(response).await?;
        Ok(normalize_response(response, &url, &["assets.video"])
            .await?
            .into_artifact())
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct LumaRequest {
    prompt: String,
    aspect_ratio: &'static str,
    #[serde(rename = "loop")]
    looping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyframes: Option<LumaKeyframes>,
}

#[derive(Debug, Serialize)]
struct LumaKeyframes {
    frame0: LumaKeyframe,
}

#[derive(Debug, Serialize)]
struct LumaKeyframe {
    #[serde(rename = "type")]
    kind: &'static str,
    url: String,
}

impl LumaRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let aspect_ratio = match req.aspect_ratio {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
        };
        Self {
            prompt: req.prompt.clone(),
            aspect_ratio,
            looping: false,
            keyframes: req.reference_image_url.clone().map(|url| LumaKeyframes {
                frame0: LumaKeyframe { kind: "image", url },
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LumaGeneration {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    failure_reason: Option<String>,
}
