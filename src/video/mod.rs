//! Video generation module.

mod credentials;
mod dispatcher;
mod engine;
mod ingest;
mod normalize;
mod orchestrator;
mod poller;
mod provider;
pub mod providers;
mod registry;
mod types;

pub use credentials::{
    candidate_order, key_for, resolve_available, select_primary, validate_api_key, KeyValidation,
    PlatformKeys, ProviderCredentials, ProviderDescriptor,
};
pub use dispatcher::SceneDispatcher;
pub use engine::{VideoEngine, VideoEngineBuilder, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR};
pub use ingest::{ArtifactIngestor, BlobStore, FsBlobStore, IngestedArtifact, MemoryBlobStore};
pub use normalize::{
    is_video_content_type, normalize_response, url_from_json, Normalized, MIN_VIDEO_BYTES,
};
pub use orchestrator::FailoverOrchestrator;
pub use poller::{JobPoller, PollReport, StatusTable};
pub use provider::{JobProvider, PollConfig, VideoProvider, DEFAULT_JOB_CEILING, DEFAULT_POLL_INTERVAL};
pub use registry::ProviderRegistry;
pub use types::{
    Artifact, ArtifactSource, AspectRatio, CompletedJob, GenerationRequest, GenerationResult,
    JobHandle, JobStatus, ProviderId, Resolution, SceneOutcome, SceneTask,
};
