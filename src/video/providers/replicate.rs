//! Replicate (Wan 2.1) video generation provider.

use crate::error::Result;
use crate::video::normalize::normalize_response;
use crate::video::poller::StatusTable;
use crate::video::provider::{JobProvider, PollConfig, DEFAULT_JOB_CEILING, DEFAULT_POLL_INTERVAL};
use crate::video::providers::{check_status, endpoint, frames_for};
use crate::video::types::{Artifact, GenerationRequest, JobHandle, JobStatus, ProviderId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "https://api.replicate.com/v1";
const DEFAULT_MODEL: &str = "wan-ai/wan2.1-t2v-14b";
const MAX_FRAMES: u32 = 81;

const STATUS: StatusTable = StatusTable {
    succeeded: &["succeeded"],
    failed: &["failed", "canceled"],
};

/// Builder for [`ReplicateProvider`].
#[derive(Debug, Clone)]
pub struct ReplicateProviderBuilder {
    base_url: String,
    model: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for ReplicateProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_CEILING,
        }
    }
}

impl ReplicateProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the model (`owner/name`).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for a prediction.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> ReplicateProvider {
        ReplicateProvider {
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

/// Replicate predictions API.
#[derive(Debug)]
pub struct ReplicateProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    poll: PollConfig,
}

impl ReplicateProvider {
    /// Creates a new [`ReplicateProviderBuilder`].
    pub fn builder() -> ReplicateProviderBuilder {
        ReplicateProviderBuilder::new()
    }

    fn prediction_url(&self, handle: &JobHandle) -> Result<reqwest::Url> {
        endpoint(&self.base_url, &format!("predictions/{}", handle.vendor_job_id))
    }
}

#[async_trait]
impl JobProvider for ReplicateProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Replicate
    }

    fn poll_config(&self) -> PollConfig {
        self.poll
    }

    async fn submit(&self, request: &GenerationRequest, key: &str) -> Result<JobHandle> {
        let body = ReplicateRequest {
            model: &self.model,
            input: ReplicateInput::from_request(request),
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "predictions")?)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let prediction: Prediction = check_status(response).await?.json().await?;

        Ok(JobHandle::new(ProviderId::Replicate, prediction.id))
    }

    async fn poll(&self, handle: &JobHandle, key: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.prediction_url(handle)?)
            .bearer_auth(key)
            .send()
            .await?;
        let prediction: Prediction = check_status(response).await?.json().await?;

        tracing::debug!(
            prediction_id = %handle.vendor_job_id,
            status = %prediction.status,
            "polled Replicate prediction"
        );
        Ok(STATUS.map(&prediction.status, || match &prediction.error {
            Some(Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => "Replicate prediction failed".into(),
        }))
    }

    async fn fetch(&self, handle: &JobHandle, key: &str) -> Result<Option<Artifact>> {
        let url = self.prediction_url(handle)?;
        let response = self.client.get(url.clone()).bearer_auth(key).send().await?;
        let response = check_status(response).await?;
        Ok(normalize_response(response, &url, &[]).await?.into_artifact())
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ReplicateRequest<'a> {
    model: &'a str,
    input: ReplicateInput,
}

#[derive(Debug, Serialize)]
struct ReplicateInput {
    prompt: String,
    num_frames: u32,
    guidance_scale: f32,
    num_inference_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

impl ReplicateInput {
    fn from_request(req: &GenerationRequest) -> Self {
        Self {
            prompt: req.prompt.clone(),
            num_frames: frames_for(req.duration_secs, MAX_FRAMES),
            guidance_scale: 5.0,
            num_inference_steps: 30,
            image: req.reference_image_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<Value>,
}
