//! fal.ai queue-based video generation provider (HunyuanVideo).

use crate::error::Result;
use crate::video::normalize::normalize_response;
use crate::video::poller::StatusTable;
use crate::video::provider::{JobProvider, PollConfig, DEFAULT_JOB_CEILING, DEFAULT_POLL_INTERVAL};
use crate::video::providers::{check_status, endpoint, frames_for};
use crate::video::types::{
    Artifact, AspectRatio, GenerationRequest, JobHandle, JobStatus, ProviderId, Resolution,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://queue.fal.run";
const TEXT_TO_VIDEO: &str = "fal-ai/hunyuan-video";
const IMAGE_TO_VIDEO: &str = "fal-ai/hunyuan-video/image-to-video";
const MAX_FRAMES: u32 = 129;

const STATUS: StatusTable = StatusTable {
    succeeded: &["COMPLETED"],
    failed: &["FAILED", "ERROR"],
};

/// Builder for [`FalVideoProvider`].
#[derive(Debug, Clone)]
pub struct FalVideoProviderBuilder {
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for FalVideoProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_CEILING,
        }
    }
}

impl FalVideoProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the queue base URL.
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
    pub fn build(self) -> FalVideoProvider {
        FalVideoProvider {
            client: reqwest::Client::new(),
            base_url: self.base_url,
            poll: PollConfig {
                interval: self.poll_interval,
                ceiling: self.timeout,
            },
        }
    }
}

/// fal.ai video generation via the queue API.
///
/// The queue app differs between text-to-video and image-to-video, so the
/// app path is folded into the job id (`{app}::{request_id}`) and recovered
/// when polling.
#[derive(Debug)]
pub struct FalVideoProvider {
    client: reqwest::Client,
    base_url: String,
    poll: PollConfig,
}

impl FalVideoProvider {
    /// Creates a new [`FalVideoProviderBuilder`].
    pub fn builder() -> FalVideoProviderBuilder {
        FalVideoProviderBuilder::new()
    }

    fn request_url(&self, handle: &JobHandle, suffix: &str) -> Result<reqwest::Url> {
        let (app, request_id) = split_job_id(&handle.vendor_job_id);
        endpoint(
            &self.base_url,
            &format!("{app}/requests/{request_id}{suffix}"),
        )
    }
}

fn split_job_id(job_id: &str) -> (&str, &str) {
    job_id
        .split_once("::")
        .unwrap_or((TEXT_TO_VIDEO, job_id))
}

#[async_trait]
impl JobProvider for FalVideoProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Fal
    }

    fn poll_config(&self) -> PollConfig {
        self.poll
    }

    async fn submit(&self, request: &GenerationRequest, key: &str) -> Result<JobHandle> {
        let app = if request.reference_image_url.is_some() {
            IMAGE_TO_VIDEO
        } else {
            TEXT_TO_VIDEO
        };
        let body = FalRequest::from_request(request);

        let response = self
            .client
            .post(endpoint(&self.base_url, app)?)
            .header("Authorization", format!("Key {key}"))
            .json(&body)
            .send()
            .await?;
        let queued: FalQueued = check_status(response).await?.json().await?;

        Ok(JobHandle::new(
            ProviderId::Fal,
            format!("{app}::{}", queued.request_id),
        ))
    }

    async fn poll(&self, handle: &JobHandle, key: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.request_url(handle, "/status")?)
            .header("Authorization", format!("Key {key}"))
            .send()
            .await?;
        let status: FalStatus = check_status(response).await?.json().await?;

        tracing::debug!(
            request_id = %handle.vendor_job_id,
            status = %status.status,
            queue_position = status.queue_position,
            "polled fal.ai request"
        );
        Ok(STATUS.map(&status.status, || {
            status
                .error
                .clone()
                .unwrap_or_else(|| "fal.ai request failed".into())
        }))
    }

    async fn fetch(&self, handle: &JobHandle, key: &str) -> Result<Option<Artifact>> {
        let url = self.request_url(handle, "")?;
        let response = self
            .client
            .get(url.clone())
            .header("Authorization", format!("Key {key}"))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(normalize_response(response, &url, &["video"])
            .await?
            .into_artifact())
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct FalRequest {
    prompt: String,
    num_frames: u32,
    num_inference_steps: u32,
    aspect_ratio: &'static str,
    resolution: &'static str,
    enable_safety_checker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
}

impl FalRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let aspect_ratio = match req.aspect_ratio {
            AspectRatio::Portrait => "9:16",
            _ => "16:9",
        };
        let resolution = match req.resolution {
            Resolution::FullHd1080 => "1080p",
            _ => "720p",
        };
        Self {
            prompt: req.prompt.clone(),
            num_frames: frames_for(req.duration_secs, MAX_FRAMES),
            num_inference_steps: 30,
            aspect_ratio,
            resolution,
            enable_safety_checker: false,
            image_url: req.reference_image_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FalQueued {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct FalStatus {
    status: String,
    #[serde(default)]
    queue_position: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReelGenError;
    use crate::video::provider::VideoProvider;
    use crate::video::types::ArtifactSource;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> FalVideoProvider {
        FalVideoProvider::builder()
            .base_url(server.uri())
            .poll_interval(Duration::from_millis(10))
            .timeout(Duration::from_secs(5))
            .build()
    }

    #[test]
    fn test_request_mapping() {
        let req = GenerationRequest::new("A cat")
            .with_aspect_ratio(AspectRatio::Square)
            .with_resolution(Resolution::Sd480)
            .with_duration(20);
        let body = FalRequest::from_request(&req);
        assert_eq!(body.aspect_ratio, "16:9");
        assert_eq!(body.resolution, "720p");
        assert_eq!(body.num_frames, 129);
    }

    #[test]
    fn test_split_job_id() {
        assert_eq!(
            split_job_id("fal-ai/hunyuan-video/image-to-video::abc"),
            (IMAGE_TO_VIDEO, "abc")
        );
        assert_eq!(split_job_id("abc"), (TEXT_TO_VIDEO, "abc"));
    }

    #[tokio::test]
    async fn test_queue_flow_with_nested_video_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fal-ai/hunyuan-video"))
            .and(header("authorization", "Key fal-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "request_id": "req-1" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fal-ai/hunyuan-video/requests/req-1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "COMPLETED" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fal-ai/hunyuan-video/requests/req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "video": { "url": "https://fal.media/files/req-1.mp4" }
            })))
            .mount(&server)
            .await;

        let job = provider(&server)
            .generate(&GenerationRequest::new("A cat"), "fal-test")
            .await
            .unwrap();
        assert_eq!(job.handle.vendor_job_id, "fal-ai/hunyuan-video::req-1");
        assert_eq!(
            job.artifact.source,
            ArtifactSource::Url("https://fal.media/files/req-1.mp4".into())
        );
    }

    #[tokio::test]
    async fn test_image_to_video_uses_image_app() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fal-ai/hunyuan-video/image-to-video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "request_id": "req-2" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fal-ai/hunyuan-video/image-to-video/requests/req-2/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FAILED",
                "error": "nsfw"
            })))
            .mount(&server)
            .await;

        let req = GenerationRequest::new("Animate").with_reference_image("https://img.test/a.png");
        let err = provider(&server).generate(&req, "fal-test").await.unwrap_err();
        assert!(matches!(err, ReelGenError::JobFailed(ref m) if m == "nsfw"));
    }
}
