//! Core types for video generation.

use crate::error::{ReelGenError, Result};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Video provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Runway ML (Gen-4).
    Runway,
    /// OpenAI Sora.
    #[serde(rename = "openai")]
    OpenAi,
    /// Replicate (Wan 2.1).
    Replicate,
    /// fal.ai (HunyuanVideo).
    Fal,
    /// Luma AI Dream Machine.
    Luma,
    /// Hugging Face inference API.
    #[serde(rename = "huggingface")]
    HuggingFace,
    /// Pollinations.ai, the free tier.
    Pollinations,
}

impl ProviderId {
    /// Every provider, in availability order. The free tier is last.
    pub const ALL: [ProviderId; 7] = [
        Self::Runway,
        Self::OpenAi,
        Self::Replicate,
        Self::Fal,
        Self::Luma,
        Self::HuggingFace,
        Self::Pollinations,
    ];

    /// The provider that is usable without any credential.
    pub const FREE_TIER: ProviderId = Self::Pollinations;

    /// Returns the wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Runway => "runway",
            Self::OpenAi => "openai",
            Self::Replicate => "replicate",
            Self::Fal => "fal",
            Self::Luma => "luma",
            Self::HuggingFace => "huggingface",
            Self::Pollinations => "pollinations",
        }
    }

    /// Returns true for the free-tier provider.
    pub fn is_free_tier(&self) -> bool {
        *self == Self::FREE_TIER
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = ReelGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "runway" => Ok(Self::Runway),
            "openai" | "sora" => Ok(Self::OpenAi),
            "replicate" => Ok(Self::Replicate),
            "fal" => Ok(Self::Fal),
            "luma" => Ok(Self::Luma),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "pollinations" | "free" => Ok(Self::Pollinations),
            other => Err(ReelGenError::InvalidRequest(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 landscape.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait.
    #[serde(rename = "9:16")]
    Portrait,
    /// 1:1 square.
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Returns the ratio string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// 480p.
    #[serde(rename = "480p")]
    Sd480,
    /// 720p.
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    /// 1080p.
    #[serde(rename = "1080p")]
    FullHd1080,
}

impl Resolution {
    /// Returns the resolution string (e.g., "720p").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sd480 => "480p",
            Self::Hd720 => "720p",
            Self::FullHd1080 => "1080p",
        }
    }
}

/// A request to generate one video clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Opaque prompt text.
    pub prompt: String,
    /// Reference image URL for image-to-video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image_url: Option<String>,
    /// Desired clip length in seconds. Vendors clamp to what they support.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
    /// Aspect ratio.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Resolution.
    #[serde(default)]
    pub resolution: Resolution,
}

fn default_duration_secs() -> u32 {
    GenerationRequest::DEFAULT_DURATION_SECS
}

impl GenerationRequest {
    /// Clip length used when none is given.
    pub const DEFAULT_DURATION_SECS: u32 = 5;

    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reference_image_url: None,
            duration_secs: Self::DEFAULT_DURATION_SECS,
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
        }
    }

    /// Sets the desired clip duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets a reference image for image-to-video generation.
    pub fn with_reference_image(mut self, url: impl Into<String>) -> Self {
        self.reference_image_url = Some(url.into());
        self
    }

    /// Duration clamped to `1..=max`.
    pub(crate) fn duration_capped(&self, max: u32) -> u32 {
        self.duration_secs.clamp(1, max)
    }
}

/// Bookkeeping for one submission attempt to one vendor.
///
/// Handles are created by `submit` and never cloned: a retry on any
/// provider always gets a fresh handle.
#[derive(Debug)]
pub struct JobHandle {
    /// Provider the job was submitted to.
    pub provider: ProviderId,
    /// Vendor-side job identifier.
    pub vendor_job_id: String,
    /// When the job was submitted.
    pub submitted_at: SystemTime,
}

impl JobHandle {
    /// Creates a handle stamped with the current time.
    pub fn new(provider: ProviderId, vendor_job_id: impl Into<String>) -> Self {
        Self {
            provider,
            vendor_job_id: vendor_job_id.into(),
            submitted_at: SystemTime::now(),
        }
    }
}

/// Canonical job status, mapped from vendor status strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued or in progress (also used for unrecognized vendor states).
    Running,
    /// Vendor reports completion.
    Succeeded,
    /// Vendor reports failure.
    Failed(String),
    /// The polling ceiling was exceeded.
    TimedOut,
}

impl JobStatus {
    /// Returns true for every state except `Running`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Where the generated bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// A vendor-hosted URL.
    Url(String),
    /// Inline video payload.
    Bytes {
        /// Raw video bytes.
        data: Vec<u8>,
        /// MIME type (e.g., "video/mp4").
        content_type: String,
    },
}

/// A resolved artifact, before ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The video itself.
    pub source: ArtifactSource,
    /// Optional vendor thumbnail URL.
    pub thumbnail_url: Option<String>,
}

impl Artifact {
    /// Artifact pointing at a URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source: ArtifactSource::Url(url.into()),
            thumbnail_url: None,
        }
    }

    /// Artifact carrying inline bytes.
    pub fn bytes(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            source: ArtifactSource::Bytes {
                data,
                content_type: content_type.into(),
            },
            thumbnail_url: None,
        }
    }

    /// Sets the thumbnail URL.
    pub fn with_thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = url;
        self
    }
}

/// A vendor job that reached `Succeeded` with a resolved artifact.
#[derive(Debug)]
pub struct CompletedJob {
    /// The handle of the successful attempt.
    pub handle: JobHandle,
    /// The resolved artifact.
    pub artifact: Artifact,
    /// Clip length the vendor was asked for.
    pub duration_secs: u32,
}

/// Final result of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Provider that produced the clip.
    pub provider: ProviderId,
    /// Stable URL of the ingested clip.
    pub artifact_url: String,
    /// Optional thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Clip length in seconds.
    pub duration_secs: u32,
    /// Vendor-side job identifier.
    pub vendor_job_id: String,
}

/// One scene of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneTask {
    /// Position of the scene in the batch.
    pub index: usize,
    /// The request for this scene.
    pub request: GenerationRequest,
}

impl SceneTask {
    /// Creates a scene task.
    pub fn new(index: usize, request: GenerationRequest) -> Self {
        Self { index, request }
    }
}

/// Outcome of one scene of a batch.
#[derive(Debug, Clone)]
pub struct SceneOutcome {
    /// Position of the scene in the batch.
    pub index: usize,
    /// The result, or the rendered error.
    pub result: std::result::Result<GenerationResult, String>,
    /// Provider that produced the clip, or the assigned start provider on failure.
    pub provider: ProviderId,
}

impl SceneOutcome {
    /// Returns true if the scene produced a clip.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
