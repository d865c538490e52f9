//! Bounded-concurrency batch generation.

use crate::video::credentials::{resolve_available, ProviderCredentials};
use crate::video::orchestrator::FailoverOrchestrator;
use crate::video::types::{ProviderId, SceneOutcome, SceneTask};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

/// Runs many scenes through the failover orchestrator, at most `C` at once.
#[derive(Debug, Clone)]
pub struct SceneDispatcher {
    orchestrator: Arc<FailoverOrchestrator>,
}

impl SceneDispatcher {
    /// Creates a dispatcher over a shared orchestrator.
    pub fn new(orchestrator: Arc<FailoverOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Generates every scene and returns one outcome per task, sorted by
    /// index. Never fails: errors and panicked tasks become error outcomes.
    ///
    /// Start providers are assigned round-robin over the available providers
    /// so that a batch spreads across vendors; each scene still fails over on
    /// its own. A `concurrency` of 0 is treated as 1.
    pub async fn generate_many(
        &self,
        tasks: Vec<SceneTask>,
        creds: &ProviderCredentials,
        concurrency: usize,
    ) -> Vec<SceneOutcome> {
        let concurrency = concurrency.max(1);
        let total = tasks.len();
        let available = resolve_available(creds, self.orchestrator.platform());
        tracing::info!(
            scenes = total,
            concurrency,
            providers = ?available,
            "dispatching scene batch"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let creds = Arc::new(creds.clone());
        let mut handles = Vec::with_capacity(total);

        for (i, task) in tasks.into_iter().enumerate() {
            let start = available
                .get(i % available.len().max(1))
                .copied()
                .unwrap_or(ProviderId::FREE_TIER);
            let index = task.index;
            let sem = Arc::clone(&semaphore);
            let outcomes_ref = Arc::clone(&outcomes);
            let orchestrator = Arc::clone(&self.orchestrator);
            let creds = Arc::clone(&creds);

            let handle = tokio::spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(_permit) => orchestrator
                        .execute(&task.request, &creds, Some(start))
                        .await
                        .map_err(|e| e.to_string()),
                    Err(_) => Err("semaphore closed".to_string()),
                };

                let provider = result.as_ref().map(|r| r.provider).unwrap_or(start);
                match &result {
                    Ok(_) => tracing::debug!(scene = index, provider = %provider, "scene done"),
                    Err(e) => tracing::warn!(scene = index, "scene failed: {e}"),
                }
                outcomes_ref.lock().await.push(SceneOutcome {
                    index,
                    result,
                    provider,
                });
            });
            handles.push((index, start, handle));
        }

        for (index, start, handle) in handles {
            if let Err(e) = handle.await {
                tracing::warn!(scene = index, "scene task failed: {e}");
                outcomes.lock().await.push(SceneOutcome {
                    index,
                    result: Err(format!("task failed: {e}")),
                    provider: start,
                });
            }
        }

        let mut outcomes = std::mem::take(&mut *outcomes.lock().await);
        outcomes.sort_by_key(|o| o.index);

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(scenes = total, succeeded, "scene batch finished");
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReelGenError;
    use crate::testing::{memory_ingestor, rejected, InFlight, ScriptedClip};
    use crate::video::credentials::PlatformKeys;
    use crate::video::ingest::{ArtifactIngestor, MemoryBlobStore};
    use crate::video::providers::PollinationsProvider;
    use crate::video::registry::ProviderRegistry;
    use crate::video::types::GenerationRequest;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(registry: ProviderRegistry) -> SceneDispatcher {
        SceneDispatcher::new(Arc::new(FailoverOrchestrator::new(
            registry,
            Arc::new(PlatformKeys::default()),
            memory_ingestor(),
        )))
    }

    fn scenes(n: usize) -> Vec<SceneTask> {
        (0..n)
            .map(|i| SceneTask::new(i, GenerationRequest::new(format!("scene {i}"))))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bound_and_wall_time() {
        let gauge = Arc::new(InFlight::default());
        let free = Arc::new(
            ScriptedClip::new(ProviderId::Pollinations)
                .with_delay(Duration::from_millis(100))
                .with_in_flight(gauge.clone()),
        );
        let registry = ProviderRegistry::new().register_arc(free.clone());

        let start = Instant::now();
        let outcomes = dispatcher(registry)
            .generate_many(scenes(10), &ProviderCredentials::new(), 3)
            .await;
        let elapsed = start.elapsed();

        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(SceneOutcome::is_success));
        assert_eq!(gauge.max(), 3);
        assert_eq!(free.calls(), 10);
        // ceil(10 / 3) waves of 100ms
        assert!(elapsed >= Duration::from_millis(400), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_concurrency_runs_serially() {
        let gauge = Arc::new(InFlight::default());
        let registry = ProviderRegistry::new().register(
            ScriptedClip::new(ProviderId::Pollinations)
                .with_delay(Duration::from_millis(10))
                .with_in_flight(gauge.clone()),
        );

        let outcomes = dispatcher(registry)
            .generate_many(scenes(4), &ProviderCredentials::new(), 0)
            .await;
        assert_eq!(outcomes.len(), 4);
        assert_eq!(gauge.max(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_scene_does_not_block_others() {
        let registry = ProviderRegistry::new().register(ScriptedClip::new(ProviderId::Pollinations));
        let mut tasks = scenes(6);
        tasks[2].request.prompt.clear();
        tasks[4].request.prompt = "  ".into();

        let outcomes = dispatcher(registry)
            .generate_many(tasks, &ProviderCredentials::new(), 2)
            .await;

        assert_eq!(outcomes.len(), 6);
        let failed: Vec<usize> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.index)
            .collect();
        assert_eq!(failed, vec![2, 4]);
        assert!(outcomes[2]
            .result
            .as_ref()
            .is_err_and(|e| e.contains("0 attempted")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_sorted_despite_completion_order() {
        let registry = ProviderRegistry::new()
            .register(ScriptedClip::new(ProviderId::Fal).with_delay(Duration::from_millis(300)))
            .register(
                ScriptedClip::new(ProviderId::Pollinations).with_delay(Duration::from_millis(10)),
            );
        let creds = ProviderCredentials::new().with_key(ProviderId::Fal, "fal-user");

        let outcomes = dispatcher(registry).generate_many(scenes(6), &creds, 6).await;

        let indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        let providers: Vec<ProviderId> = outcomes.iter().map(|o| o.provider).collect();
        assert_eq!(
            providers,
            vec![
                ProviderId::Fal,
                ProviderId::Pollinations,
                ProviderId::Fal,
                ProviderId::Pollinations,
                ProviderId::Fal,
                ProviderId::Pollinations,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicked_scene_becomes_error_outcome() {
        let registry = ProviderRegistry::new()
            .register(ScriptedClip::new(ProviderId::Fal).panicking())
            .register(ScriptedClip::new(ProviderId::Pollinations));
        let creds = ProviderCredentials::new().with_key(ProviderId::Fal, "fal-user");

        let outcomes = dispatcher(registry).generate_many(scenes(4), &creds, 2).await;

        assert_eq!(outcomes.len(), 4);
        assert!(!outcomes[0].is_success());
        assert!(outcomes[1].is_success());
        assert!(!outcomes[2].is_success());
        assert!(outcomes[3].is_success());
        assert_eq!(outcomes[0].provider, ProviderId::Fal);
        assert!(outcomes[0].result.as_ref().is_err_and(|e| e.contains("task failed")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adapter_failures_stay_with_their_scenes() {
        fn odd_scene(prompt: &str) -> bool {
            prompt
                .rsplit(' ')
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .is_some_and(|n| n % 2 == 1)
        }
        let fal = Arc::new(
            ScriptedClip::new(ProviderId::Fal)
                .failing(rejected)
                .only_for(odd_scene),
        );
        let free = Arc::new(
            ScriptedClip::new(ProviderId::Pollinations)
                .failing(|| ReelGenError::VendorTransient("503: busy".into()))
                .only_for(odd_scene),
        );
        let registry = ProviderRegistry::new()
            .register_arc(fal.clone())
            .register_arc(free.clone());
        let creds = ProviderCredentials::new().with_key(ProviderId::Fal, "fal-user");

        let outcomes = dispatcher(registry).generate_many(scenes(6), &creds, 3).await;

        assert_eq!(outcomes.len(), 6);
        for outcome in &outcomes {
            if outcome.index % 2 == 1 {
                let err = outcome.result.as_ref().unwrap_err();
                assert!(err.contains("all providers (2 attempted)"), "{err}");
            } else {
                assert!(outcome.is_success(), "scene {} failed", outcome.index);
            }
        }
        // three odd scenes, each tried on both providers
        assert_eq!(fal.calls() + free.calls(), 3 * 2 + 3);
    }

    #[tokio::test]
    async fn test_parallel_free_tier_scenes_keep_their_own_clips() {
        let server = MockServer::start().await;
        for i in 0..8u8 {
            Mock::given(method("GET"))
                .and(path(format!("/video/scene-{i}")))
                .respond_with(ResponseTemplate::new(200).set_body_raw(vec![i; 2000], "video/mp4"))
                .mount(&server)
                .await;
        }
        let store = Arc::new(MemoryBlobStore::new());
        let registry = ProviderRegistry::new().register(
            PollinationsProvider::builder()
                .base_url(format!("{}/video", server.uri()))
                .build(),
        );
        let dispatcher = SceneDispatcher::new(Arc::new(FailoverOrchestrator::new(
            registry,
            Arc::new(PlatformKeys::default()),
            ArtifactIngestor::new(store.clone()),
        )));
        let tasks = (0..8)
            .map(|i| SceneTask::new(i, GenerationRequest::new(format!("scene-{i}"))))
            .collect();

        let outcomes = dispatcher
            .generate_many(tasks, &ProviderCredentials::new(), 8)
            .await;

        assert_eq!(outcomes.len(), 8);
        let urls: HashSet<&str> = outcomes
            .iter()
            .map(|o| o.result.as_ref().unwrap().artifact_url.as_str())
            .collect();
        assert_eq!(urls.len(), 8);
        assert_eq!(store.len(), 8);
        for outcome in &outcomes {
            let url = &outcome.result.as_ref().unwrap().artifact_url;
            let filename = url.strip_prefix("memory://").unwrap();
            let (data, _) = store.get(filename).unwrap();
            assert!(data.iter().all(|&b| usize::from(b) == outcome.index), "scene {}", outcome.index);
        }
    }
}
