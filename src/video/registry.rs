//! Lookup table from [`ProviderId`] to adapter.

use crate::video::provider::VideoProvider;
use crate::video::types::ProviderId;
use std::collections::HashMap;
use std::sync::Arc;

/// Registered video adapters, one per provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn VideoProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every compiled-in adapter at its default settings.
    pub fn with_defaults() -> Self {
        use crate::video::providers::*;

        #[allow(unused_mut)]
        let mut registry = Self::new().register(PollinationsProvider::builder().build());

        #[cfg(feature = "runway")]
        {
            registry = registry.register(RunwayProvider::builder().build());
        }
        #[cfg(feature = "openai")]
        {
            registry = registry.register(SoraProvider::builder().build());
        }
        #[cfg(feature = "replicate")]
        {
            registry = registry.register(ReplicateProvider::builder().build());
        }
        #[cfg(feature = "fal")]
        {
            registry = registry.register(FalVideoProvider::builder().build());
        }
        #[cfg(feature = "luma")]
        {
            registry = registry.register(LumaProvider::builder().build());
        }
        #[cfg(feature = "huggingface")]
        {
            registry = registry.register(HuggingFaceProvider::builder().build());
        }

        registry
    }

    /// Registers an adapter, replacing any previous one with the same id.
    pub fn register<P: VideoProvider + 'static>(self, provider: P) -> Self {
        self.register_arc(Arc::new(provider))
    }

    /// Registers a shared adapter.
    pub fn register_arc(mut self, provider: Arc<dyn VideoProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    /// Returns the adapter for a provider.
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn VideoProvider>> {
        self.providers.get(&id).cloned()
    }

    /// Registered providers in [`ProviderId::ALL`] order.
    pub fn ids(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.providers.contains_key(id))
            .collect()
    }
}
