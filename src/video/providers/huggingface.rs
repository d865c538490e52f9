//! Hugging Face inference API provider (LTX-Video).
//!
//! The inference endpoint answers synchronously with the clip body, so this
//! adapter implements [`VideoProvider`] directly instead of going through the
//! job poller. A 503 means the model is still loading; the request is retried
//! a bounded number of times.

use crate::error::{ReelGenError, Result};
use crate::video::normalize::normalize_response;
use crate::video::provider::{VideoProvider, DEFAULT_JOB_CEILING};
use crate::video::providers::{check_status, endpoint, frames_for, local_job_id};
use crate::video::types::{CompletedJob, GenerationRequest, JobHandle, ProviderId};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const BASE_URL: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_MODEL: &str = "Lightricks/LTX-Video-0.9.8-13B-distilled";
const MAX_FRAMES: u32 = 65;
const DEFAULT_LOADING_WAIT: Duration = Duration::from_secs(30);
const DEFAULT_LOADING_RETRIES: u32 = 3;

/// Builder for [`HuggingFaceProvider`].
#[derive(Debug, Clone)]
pub struct HuggingFaceProviderBuilder {
    base_url: String,
    model: String,
    loading_wait: Duration,
    loading_retries: u32,
    timeout: Duration,
}

impl Default for HuggingFaceProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            loading_wait: DEFAULT_LOADING_WAIT,
            loading_retries: DEFAULT_LOADING_RETRIES,
            timeout: DEFAULT_JOB_CEILING,
        }
    }
}

impl HuggingFaceProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the inference API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the model repository id.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets how long to wait before retrying while the model loads.
    pub fn loading_wait(mut self, wait: Duration) -> Self {
        self.loading_wait = wait;
        self
    }

    /// Sets how many times a 503 (model loading) is retried.
    pub fn loading_retries(mut self, retries: u32) -> Self {
        self.loading_retries = retries;
        self
    }

    /// Sets the ceiling on the whole call, retries included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> HuggingFaceProvider {
        HuggingFaceProvider {
            client: reqwest::Client::new(),
            base_url: self.base_url,
            model: self.model,
            loading_wait: self.loading_wait,
            loading_retries: self.loading_retries,
            timeout: self.timeout,
        }
    }
}

/// Hugging Face text-to-video inference.
#[derive(Debug)]
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    loading_wait: Duration,
    loading_retries: u32,
    timeout: Duration,
}

impl HuggingFaceProvider {
    /// Creates a new [`HuggingFaceProviderBuilder`].
    pub fn builder() -> HuggingFaceProviderBuilder {
        HuggingFaceProviderBuilder::new()
    }

    async fn infer(&self, request: &GenerationRequest, key: &str) -> Result<CompletedJob> {
        let url = endpoint(&self.base_url, &self.model)?;
        let body = HfRequest::from_request(request);
        let mut attempt = 0u32;

        let response = loop {
            let mut builder = self.client.post(url.clone()).json(&body);
            if !key.is_empty() {
                builder = builder.bearer_auth(key);
            }
            let response = builder.send().await?;

            if response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
                && attempt < self.loading_retries
            {
                attempt += 1;
                tracing::debug!(
                    model = %self.model,
                    attempt,
                    wait_secs = self.loading_wait.as_secs(),
                    "model is loading, retrying"
                );
                tokio::time::sleep(self.loading_wait).await;
                continue;
            }
            break check_status(response).await?;
        };

        let artifact = normalize_response(response, &url, &[])
            .await?
            .into_artifact()
            .ok_or_else(|| {
                ReelGenError::ArtifactMissing("Hugging Face did not return video data".into())
            })?;

        Ok(CompletedJob {
            handle: JobHandle::new(ProviderId::HuggingFace, local_job_id("hf")),
            artifact,
            duration_secs: (body.parameters.num_frames / 8).max(1),
        })
    }
}

#[async_trait]
impl VideoProvider for HuggingFaceProvider {
    fn id(&self) -> ProviderId {
        ProviderId::HuggingFace
    }

    async fn generate(&self, request: &GenerationRequest, key: &str) -> Result<CompletedJob> {
        tokio::time::timeout(self.timeout, self.infer(request, key))
            .await
            .map_err(|_| ReelGenError::TimedOut(self.timeout))?
    }
}

#[derive(Debug, Serialize)]
struct HfRequest {
    inputs: String,
    parameters: HfParameters,
}

#[derive(Debug, Serialize)]
struct HfParameters {
    num_frames: u32,
    num_inference_steps: u32,
}

impl HfRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        Self {
            inputs: req.prompt.clone(),
            parameters: HfParameters {
                num_frames: frames_for(req.duration_secs, MAX_FRAMES),
                num_inference_steps: 25,
            },
        }
    }
}
