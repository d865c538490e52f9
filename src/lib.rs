#![warn(missing_docs)]
//! ReelGen - multi-provider AI video generation with failover.
//!
//! This crate generates short video clips through whichever vendor the
//! caller has a key for, falling back across providers and finally to a
//! free tier that needs no key at all.
//!
//! # Quick Start - One Clip
//!
//! ```no_run
//! use reelgen::{GenerationRequest, ProviderCredentials, ProviderId, VideoEngine};
//!
//! #[tokio::main]
//! async fn main() -> reelgen::Result<()> {
//!     let engine = VideoEngine::builder().build()?;
//!     let creds = ProviderCredentials::new().with_key(ProviderId::Fal, "my-fal-key");
//!     let request = GenerationRequest::new("A paper boat drifting down a rainy street")
//!         .with_duration(5);
//!     let clip = engine.generate(&request, &creds, None).await?;
//!     println!("{} -> {}", clip.provider, clip.artifact_url);
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Scene Batch
//!
//! ```no_run
//! use reelgen::{GenerationRequest, ProviderCredentials, SceneTask, VideoEngine};
//!
//! #[tokio::main]
//! async fn main() -> reelgen::Result<()> {
//!     let engine = VideoEngine::builder().concurrency(3).build()?;
//!     let tasks = ["Sunrise over dunes", "A caravan crossing", "Night camp"]
//!         .iter()
//!         .enumerate()
//!         .map(|(i, p)| SceneTask::new(i, GenerationRequest::new(*p)))
//!         .collect();
//!     for outcome in engine.generate_many(tasks, &ProviderCredentials::new(), 3).await {
//!         println!("scene {}: {:?}", outcome.index, outcome.result);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `runway`: Runway ML (Gen-4 Turbo)
//! - `openai`: Sora (OpenAI)
//! - `replicate`: Replicate (Wan 2.1)
//! - `fal`: fal.ai (HunyuanVideo)
//! - `luma`: Luma AI (Dream Machine)
//! - `huggingface`: Hugging Face inference (LTX-Video)
//!
//! Pollinations (free tier) is always compiled in.
//!
//! ## Meta Features
//! - `video`: All BYOK providers
//! - `cli`: Command-line interface

mod error;
pub mod video;

#[cfg(test)]
mod testing;

// Re-export error types at crate root
pub use error::{sanitize_error_message, ProviderFailure, ReelGenError, Result};

// Re-export commonly used types
pub use video::{
    validate_api_key, Artifact, ArtifactSource, AspectRatio, BlobStore, CompletedJob,
    FsBlobStore, GenerationRequest, GenerationResult, JobProvider, KeyValidation, PlatformKeys,
    ProviderCredentials, ProviderId, ProviderRegistry, Resolution, SceneOutcome, SceneTask,
    VideoEngine, VideoEngineBuilder, VideoProvider,
};

pub use video::providers::{PollinationsModel, PollinationsProvider, PollinationsProviderBuilder};

#[cfg(feature = "runway")]
pub use video::providers::{RunwayProvider, RunwayProviderBuilder};

#[cfg(feature = "openai")]
pub use video::providers::{SoraModel, SoraProvider, SoraProviderBuilder};

#[cfg(feature = "replicate")]
pub use video::providers::{ReplicateProvider, ReplicateProviderBuilder};

#[cfg(feature = "fal")]
pub use video::providers::{FalVideoProvider, FalVideoProviderBuilder};

#[cfg(feature = "luma")]
pub use video::providers::{LumaProvider, LumaProviderBuilder};

#[cfg(feature = "huggingface")]
pub use video::providers::{HuggingFaceProvider, HuggingFaceProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ReelGenError, Result};
    pub use crate::video::{
        GenerationRequest, GenerationResult, ProviderCredentials, ProviderId, SceneTask,
        VideoEngine, VideoProvider,
    };
}
