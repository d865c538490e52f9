//! Pollinations.ai free-tier video generation.
//!
//! A single GET returns the clip (binary body, JSON with a URL, or a redirect
//! to the file). Several free sub-models are tried in order; a sub-model that
//! errors or returns nothing usable is skipped.

use crate::error::{ReelGenError, Result};
use crate::video::normalize::{normalize_response, Normalized};
use crate::video::provider::{VideoProvider, DEFAULT_JOB_CEILING};
use crate::video::providers::local_job_id;
use crate::video::types::{AspectRatio, CompletedJob, GenerationRequest, JobHandle, ProviderId};
use async_trait::async_trait;
use std::time::Duration;

const BASE_URL: &str = "https://gen.pollinations.ai/video";
const MAX_DURATION_SECS: u32 = 8;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Free Pollinations video models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollinationsModel {
    /// ByteDance Seedance, the best free model.
    Seedance,
    /// Grok video (alpha).
    GrokVideo,
}

impl PollinationsModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seedance => "seedance",
            Self::GrokVideo => "grok-video",
        }
    }
}

/// Builder for [`PollinationsProvider`].
#[derive(Debug, Clone)]
pub struct PollinationsProviderBuilder {
    base_url: String,
    models: Vec<PollinationsModel>,
    request_timeout: Duration,
    timeout: Duration,
}

impl Default for PollinationsProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            models: vec![PollinationsModel::Seedance, PollinationsModel::GrokVideo],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            timeout: DEFAULT_JOB_CEILING,
        }
    }
}

impl PollinationsProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the video endpoint base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the sub-models to try, in order.
    pub fn models(mut self, models: Vec<PollinationsModel>) -> Self {
        self.models = models;
        self
    }

    /// Sets the timeout of a single sub-model request.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the ceiling on the whole call across sub-models.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> PollinationsProvider {
        PollinationsProvider {
            client: reqwest::Client::new(),
            base_url: self.base_url,
            models: self.models,
            request_timeout: self.request_timeout,
            timeout: self.timeout,
        }
    }
}

/// Pollinations free-tier provider. Usable without a key.
#[derive(Debug)]
pub struct PollinationsProvider {
    client: reqwest::Client,
    base_url: String,
    models: Vec<PollinationsModel>,
    request_timeout: Duration,
    timeout: Duration,
}

impl PollinationsProvider {
    /// Creates a new [`PollinationsProviderBuilder`].
    pub fn builder() -> PollinationsProviderBuilder {
        PollinationsProviderBuilder::new()
    }

    fn model_url(&self, request: &GenerationRequest, model: PollinationsModel) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ReelGenError::InvalidRequest(format!("bad endpoint {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ReelGenError::InvalidRequest(format!("bad endpoint {}", self.base_url)))?
            .pop_if_empty()
            .push(&request.prompt);

        let (width, height) = dimensions(request.aspect_ratio);
        url.query_pairs_mut()
            .append_pair("duration", &request.duration_capped(MAX_DURATION_SECS).to_string())
            .append_pair("width", &width.to_string())
            .append_pair("height", &height.to_string())
            .append_pair("model", model.as_str());
        Ok(url)
    }

    async fn try_model(
        &self,
        request: &GenerationRequest,
        model: PollinationsModel,
        key: &str,
    ) -> Result<Normalized> {
        let url = self.model_url(request, model)?;
        let mut builder = self.client.get(url.clone()).timeout(self.request_timeout);
        if !key.is_empty() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReelGenError::from_status(status.as_u16(), &text));
        }
        normalize_response(response, &url, &[]).await
    }

    async fn try_models(&self, request: &GenerationRequest, key: &str) -> Result<CompletedJob> {
        let mut last_reason = String::from("no models configured");
        for &model in &self.models {
            tracing::debug!(model = model.as_str(), "trying Pollinations model");
            match self.try_model(request, model, key).await {
                Ok(Normalized::Artifact(artifact)) => {
                    tracing::info!(model = model.as_str(), "Pollinations video generated");
                    return Ok(CompletedJob {
                        handle: JobHandle::new(
                            ProviderId::Pollinations,
                            local_job_id(&format!("pollinations-{}", model.as_str())),
                        ),
                        artifact,
                        duration_secs: request.duration_capped(MAX_DURATION_SECS),
                    });
                }
                Ok(Normalized::TooSmall(len)) => {
                    tracing::debug!(model = model.as_str(), len, "response too small, skipping");
                    last_reason = format!("{}: response too small ({len} bytes)", model.as_str());
                }
                Ok(Normalized::Unrecognized(content_type)) => {
                    tracing::debug!(
                        model = model.as_str(),
                        content_type = %content_type,
                        "unexpected content type, skipping"
                    );
                    last_reason = format!("{}: unexpected content type {content_type}", model.as_str());
                }
                Err(e) => {
                    tracing::debug!(model = model.as_str(), "model failed: {e}");
                    last_reason = format!("{}: {e}", model.as_str());
                }
            }
        }

        Err(ReelGenError::VendorTransient(format!(
            "all free video models failed; last: {last_reason}"
        )))
    }
}

fn dimensions(aspect: AspectRatio) -> (u32, u32) {
    match aspect {
        AspectRatio::Portrait => (480, 848),
        AspectRatio::Square => (480, 480),
        AspectRatio::Landscape => (848, 480),
    }
}

#[async_trait]
impl VideoProvider for PollinationsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Pollinations
    }

    async fn generate(&self, request: &GenerationRequest, key: &str) -> Result<CompletedJob> {
        tokio::time::timeout(self.timeout, self.try_models(request, key))
            .await
            .map_err(|_| ReelGenError::TimedOut(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::types::ArtifactSource;
    use serde_json::json;
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> PollinationsProvider {
        PollinationsProvider::builder()
            .base_url(format!("{}/video", server.uri()))
            .build()
    }

    #[test]
    fn test_model_url() {
        let provider = PollinationsProvider::builder().build();
        let req = GenerationRequest::new("a cat/dog")
            .with_duration(12)
            .with_aspect_ratio(AspectRatio::Portrait);
        let url = provider.model_url(&req, PollinationsModel::Seedance).unwrap();
        assert_eq!(url.path(), "/video/a%20cat%2Fdog");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("duration".into(), "8".into())));
        assert!(query.contains(&("width".into(), "480".into())));
        assert!(query.contains(&("height".into(), "848".into())));
        assert!(query.contains(&("model".into(), "seedance".into())));
    }

    #[tokio::test]
    async fn test_falls_back_to_second_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/video/.+"))
            .and(query_param("model", "seedance"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/video/.+"))
            .and(query_param("model", "grok-video"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9u8; 4000], "video/mp4"))
            .expect(1)
            .mount(&server)
            .await;

        let job = provider(&server)
            .generate(&GenerationRequest::new("A cat"), "")
            .await
            .unwrap();
        assert_eq!(job.handle.provider, ProviderId::Pollinations);
        assert!(job.handle.vendor_job_id.starts_with("pollinations-grok-video-"));
        assert!(matches!(job.artifact.source, ArtifactSource::Bytes { ref data, .. } if data.len() == 4000));
    }

    #[tokio::test]
    async fn test_too_small_body_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/video/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 12], "video/mp4"))
            .expect(2)
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate(&GenerationRequest::new("A cat"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ReelGenError::VendorTransient(_)));
        assert!(
            err.to_string().contains("grok-video: response too small (12 bytes)"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/video/.+"))
            .respond_with(ResponseTemplate::new(503).set_body_string("queue full"))
            .expect(2)
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate(&GenerationRequest::new("A cat"), "")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("grok-video"), "{msg}");
        assert!(msg.contains("queue full"), "{msg}");
    }

    #[tokio::test]
    async fn test_json_url_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/video/.+"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "video_url": "https://media.pollinations.ai/v.mp4" })),
            )
            .mount(&server)
            .await;

        let job = provider(&server)
            .generate(&GenerationRequest::new("A cat").with_duration(3), "")
            .await
            .unwrap();
        assert_eq!(job.duration_secs, 3);
        assert_eq!(
            job.artifact.source,
            ArtifactSource::Url("https://media.pollinations.ai/v.mp4".into())
        );
    }

    #[tokio::test]
    async fn test_redirect_is_the_clip() {
        let server = MockServer::start().await;
        let target = format!("{}/files/clip.mp4", server.uri());
        Mock::given(method("GET"))
            .and(path_regex(r"^/video/.+"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", target.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
            .mount(&server)
            .await;

        let job = provider(&server)
            .generate(&GenerationRequest::new("A cat"), "")
            .await
            .unwrap();
        assert_eq!(job.artifact.source, ArtifactSource::Url(target));
    }
}
