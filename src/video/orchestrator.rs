//! Provider failover for a single generation.

use crate::error::{ProviderFailure, ReelGenError, Result};
use crate::video::credentials::{candidate_order, key_for, PlatformKeys, ProviderCredentials};
use crate::video::ingest::ArtifactIngestor;
use crate::video::provider::VideoProvider;
use crate::video::registry::ProviderRegistry;
use crate::video::types::{GenerationRequest, GenerationResult, ProviderId};
use std::sync::Arc;

/// Walks the candidate list until one provider yields an ingested clip.
#[derive(Debug, Clone)]
pub struct FailoverOrchestrator {
    registry: ProviderRegistry,
    platform: Arc<PlatformKeys>,
    ingestor: ArtifactIngestor,
}

impl FailoverOrchestrator {
    /// Creates an orchestrator over the given adapters and shared keys.
    pub fn new(
        registry: ProviderRegistry,
        platform: Arc<PlatformKeys>,
        ingestor: ArtifactIngestor,
    ) -> Self {
        Self {
            registry,
            platform,
            ingestor,
        }
    }

    /// Registered adapters.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Platform-level keys.
    pub fn platform(&self) -> &PlatformKeys {
        &self.platform
    }

    /// Generates one clip, failing over across providers.
    ///
    /// `provider_override` starts the walk at that provider when it has a
    /// usable key. Each provider is attempted at most once. The only error
    /// returned is [`ReelGenError::AggregateFailure`].
    pub async fn execute(
        &self,
        request: &GenerationRequest,
        creds: &ProviderCredentials,
        provider_override: Option<ProviderId>,
    ) -> Result<GenerationResult> {
        if request.prompt.trim().is_empty() {
            return Err(ReelGenError::AggregateFailure {
                attempts: 0,
                last_error: "prompt is empty".into(),
                failures: Vec::new(),
            });
        }

        let candidates = candidate_order(creds, &self.platform, provider_override);
        tracing::info!(?candidates, "selected video providers");

        let mut failures: Vec<ProviderFailure> = Vec::new();
        for provider in candidates {
            let Some(key) = key_for(provider, creds, &self.platform) else {
                tracing::debug!(provider = %provider, "no usable key, skipping");
                continue;
            };
            let Some(adapter) = self.registry.get(provider) else {
                tracing::debug!(provider = %provider, "no adapter registered, skipping");
                continue;
            };

            match self.attempt(provider, adapter.as_ref(), request, &key).await {
                Ok(result) => {
                    tracing::info!(
                        provider = %provider,
                        job_id = %result.vendor_job_id,
                        attempts = failures.len() + 1,
                        "video generated"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(provider = %provider, "generation failed, trying next provider: {e}");
                    failures.push(ProviderFailure {
                        provider,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let last_error = failures
            .last()
            .map(|f| f.reason.clone())
            .unwrap_or_else(|| "no provider could be attempted".into());
        Err(ReelGenError::AggregateFailure {
            attempts: failures.len(),
            last_error,
            failures,
        })
    }

    async fn attempt(
        &self,
        provider: ProviderId,
        adapter: &dyn VideoProvider,
        request: &GenerationRequest,
        key: &str,
    ) -> Result<GenerationResult> {
        let job = adapter.generate(request, key).await?;
        let ingested = self.ingestor.ingest(&job).await?;

        Ok(GenerationResult {
            provider,
            artifact_url: ingested.url,
            thumbnail_url: ingested.thumbnail_url,
            duration_secs: job.duration_secs,
            vendor_job_id: job.handle.vendor_job_id,
        })
    }
}
