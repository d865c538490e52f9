//! Public entry point tying selection, failover and batching together.

use crate::error::{ReelGenError, Result};
use crate::video::credentials::{PlatformKeys, ProviderCredentials};
use crate::video::dispatcher::SceneDispatcher;
use crate::video::ingest::{ArtifactIngestor, BlobStore, FsBlobStore};
use crate::video::orchestrator::FailoverOrchestrator;
use crate::video::registry::ProviderRegistry;
use crate::video::types::{GenerationRequest, GenerationResult, ProviderId, SceneOutcome, SceneTask};
use std::sync::Arc;

/// Default number of scenes generated at once.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default directory for [`FsBlobStore`] when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "reelgen-output";

/// Builder for [`VideoEngine`].
#[derive(Default)]
pub struct VideoEngineBuilder {
    registry: Option<ProviderRegistry>,
    platform_keys: Option<PlatformKeys>,
    blob_store: Option<Arc<dyn BlobStore>>,
    rehost_urls: bool,
    concurrency: Option<usize>,
}

impl VideoEngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the adapters. Defaults to [`ProviderRegistry::with_defaults`].
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets platform keys. Falls back to [`PlatformKeys::from_env`].
    pub fn platform_keys(mut self, keys: PlatformKeys) -> Self {
        self.platform_keys = Some(keys);
        self
    }

    /// Sets the blob store. Falls back to an [`FsBlobStore`] in
    /// `REELGEN_OUTPUT_DIR` (default `reelgen-output`).
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// Download vendor-hosted clips into the blob store too.
    pub fn rehost_urls(mut self, rehost: bool) -> Self {
        self.rehost_urls = rehost;
        self
    }

    /// Sets the default batch concurrency. Falls back to
    /// `REELGEN_CONCURRENCY`, then [`DEFAULT_CONCURRENCY`].
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Builds the engine.
    pub fn build(self) -> Result<VideoEngine> {
        let concurrency = match self.concurrency {
            Some(c) => c,
            None => match std::env::var("REELGEN_CONCURRENCY") {
                Ok(raw) => raw.trim().parse::<usize>().map_err(|_| {
                    ReelGenError::InvalidRequest(format!("REELGEN_CONCURRENCY is not a number: {raw}"))
                })?,
                Err(_) => DEFAULT_CONCURRENCY,
            },
        }
        .max(1);

        let blob_store = self.blob_store.unwrap_or_else(|| {
            let dir = std::env::var("REELGEN_OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into());
            Arc::new(FsBlobStore::new(dir))
        });
        let platform = Arc::new(self.platform_keys.unwrap_or_else(PlatformKeys::from_env));
        let registry = self.registry.unwrap_or_else(ProviderRegistry::with_defaults);
        let ingestor = ArtifactIngestor::new(blob_store).rehost_urls(self.rehost_urls);

        let orchestrator = Arc::new(FailoverOrchestrator::new(registry, platform, ingestor));
        Ok(VideoEngine {
            dispatcher: SceneDispatcher::new(Arc::clone(&orchestrator)),
            orchestrator,
            concurrency,
        })
    }
}

/// Multi-provider video generation with failover and batching.
#[derive(Debug, Clone)]
pub struct VideoEngine {
    orchestrator: Arc<FailoverOrchestrator>,
    dispatcher: SceneDispatcher,
    concurrency: usize,
}

impl VideoEngine {
    /// Creates a new [`VideoEngineBuilder`].
    pub fn builder() -> VideoEngineBuilder {
        VideoEngineBuilder::new()
    }

    /// Generates one clip. See [`FailoverOrchestrator::execute`].
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        creds: &ProviderCredentials,
        provider_override: Option<ProviderId>,
    ) -> Result<GenerationResult> {
        self.orchestrator
            .execute(request, creds, provider_override)
            .await
    }

    /// Generates many scenes. See [`SceneDispatcher::generate_many`].
    pub async fn generate_many(
        &self,
        tasks: Vec<SceneTask>,
        creds: &ProviderCredentials,
        concurrency: usize,
    ) -> Vec<SceneOutcome> {
        self.dispatcher
            .generate_many(tasks, creds, concurrency)
            .await
    }

    /// Configured default batch concurrency.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Registered providers.
    pub fn providers(&self) -> Vec<ProviderId> {
        self.orchestrator.registry().ids()
    }
}
