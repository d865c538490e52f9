//! Credential resolution and provider selection.
//!
//! Callers hand in per-request [`ProviderCredentials`] (BYOK keys); the
//! platform contributes shared [`PlatformKeys`]. Everything here is pure:
//! credentials are read, never mutated, and selection is a total function
//! because the free tier needs no key.

use crate::video::types::ProviderId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Static description of a provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    /// Provider identifier.
    pub id: ProviderId,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Required key prefix, if the vendor uses a recognizable one.
    pub key_prefix: Option<&'static str>,
    /// Where to obtain a key.
    pub signup_url: &'static str,
    /// Pricing note.
    pub pricing: &'static str,
    /// Models reachable through this provider.
    pub models: &'static str,
    /// True only for the free tier.
    pub always_available: bool,
    /// Premium providers win over plain BYOK keys during selection.
    pub premium: bool,
    /// Selection priority among BYOK providers (lower wins).
    pub priority: u8,
}

static DESCRIPTORS: [ProviderDescriptor; 7] = [
    ProviderDescriptor {
        id: ProviderId::Runway,
        name: "Runway ML",
        description: "Industry-leading AI video generation. Best quality and consistency.",
        key_prefix: Some("key_"),
        signup_url: "https://app.runwayml.com/settings/api-keys",
        pricing: "From $12/mo. ~$0.05-0.10 per second of video.",
        models: "Gen-4 Turbo",
        always_available: false,
        premium: true,
        priority: 0,
    },
    ProviderDescriptor {
        id: ProviderId::OpenAi,
        name: "OpenAI (Sora)",
        description: "OpenAI's Sora video model.",
        key_prefix: Some("sk-"),
        signup_url: "https://platform.openai.com/api-keys",
        pricing: "Pay-per-second of generated video.",
        models: "Sora 2",
        always_available: false,
        premium: true,
        priority: 1,
    },
    ProviderDescriptor {
        id: ProviderId::Replicate,
        name: "Replicate",
        description: "Open-source video models in the cloud.",
        key_prefix: Some("r8_"),
        signup_url: "https://replicate.com/account/api-tokens",
        pricing: "Pay-per-use.",
        models: "Wan 2.1",
        always_available: false,
        premium: false,
        priority: 3,
    },
    ProviderDescriptor {
        id: ProviderId::Fal,
        name: "fal.ai",
        description: "Fast and affordable queue-based inference.",
        key_prefix: None,
        signup_url: "https://fal.ai/dashboard/keys",
        pricing: "Pay-per-use. ~$0.40 per clip.",
        models: "HunyuanVideo",
        always_available: false,
        premium: false,
        priority: 2,
    },
    ProviderDescriptor {
        id: ProviderId::Luma,
        name: "Luma AI",
        description: "Dream Machine video generation for cinematic content.",
        key_prefix: None,
        signup_url: "https://lumalabs.ai/dream-machine/api",
        pricing: "Pay-per-use. Free trial credits available.",
        models: "Dream Machine",
        always_available: false,
        premium: false,
        priority: 4,
    },
    ProviderDescriptor {
        id: ProviderId::HuggingFace,
        name: "Hugging Face",
        description: "Inference API with open-source models. Limited but cheap.",
        key_prefix: Some("hf_"),
        signup_url: "https://huggingface.co/settings/tokens",
        pricing: "Free tier: 300 requests/hour.",
        models: "LTX-Video",
        always_available: false,
        premium: false,
        priority: 5,
    },
    ProviderDescriptor {
        id: ProviderId::Pollinations,
        name: "Pollinations.ai (Free)",
        description: "Free AI video generation. No API key needed. Lower quality, zero cost.",
        key_prefix: None,
        signup_url: "https://pollinations.ai",
        pricing: "Free",
        models: "Seedance, Grok-Video",
        always_available: true,
        premium: false,
        priority: u8::MAX,
    },
];

impl ProviderId {
    /// Returns the static descriptor for this provider.
    pub fn descriptor(&self) -> &'static ProviderDescriptor {
        let idx = ProviderId::ALL
            .iter()
            .position(|p| p == self)
            .unwrap_or(DESCRIPTORS.len() - 1);
        &DESCRIPTORS[idx]
    }
}

/// Outcome of a key format check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValidation {
    /// Whether the key looks usable.
    pub valid: bool,
    /// Human-readable explanation.
    pub message: String,
}

impl KeyValidation {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Checks that a key has the shape the vendor issues.
pub fn validate_api_key(provider: ProviderId, key: &str) -> KeyValidation {
    let descriptor = provider.descriptor();
    if descriptor.always_available {
        return KeyValidation::ok(format!("{} is free, no key needed", descriptor.name));
    }

    let key = key.trim();
    if key.is_empty() {
        return KeyValidation::invalid("API key cannot be empty");
    }

    match descriptor.key_prefix {
        Some(prefix) if !key.starts_with(prefix) => KeyValidation::invalid(format!(
            "{} keys must start with '{prefix}'",
            descriptor.name
        )),
        _ => KeyValidation::ok("key format looks valid"),
    }
}

/// Per-request user credentials (BYOK).
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    keys: BTreeMap<ProviderId, String>,
    preferred_provider: Option<ProviderId>,
}

impl ProviderCredentials {
    /// Creates an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key for a provider. Blank keys are ignored.
    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.keys.insert(provider, key.trim().to_string());
        }
        self
    }

    /// Adds a key if one is given.
    pub fn with_optional_key(self, provider: ProviderId, key: Option<String>) -> Self {
        match key {
            Some(key) => self.with_key(provider, key),
            None => self,
        }
    }

    /// Sets the preferred provider.
    pub fn with_preferred(mut self, provider: ProviderId) -> Self {
        self.preferred_provider = Some(provider);
        self
    }

    /// Returns the user key for a provider, if any.
    pub fn key(&self, provider: ProviderId) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// Returns the preferred provider, if any.
    pub fn preferred_provider(&self) -> Option<ProviderId> {
        self.preferred_provider
    }

    /// Returns true when no user key is set.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Platform-level shared keys.
#[derive(Debug, Clone, Default)]
pub struct PlatformKeys {
    /// Shared Runway key.
    pub runway: Option<String>,
    /// Shared OpenAI key.
    pub openai: Option<String>,
    /// Pollinations key (raises free-tier limits; optional).
    pub pollinations: Option<String>,
}

impl PlatformKeys {
    /// Reads `RUNWAYML_API_SECRET`, `OPENAI_API_KEY` and `POLLINATIONS_API_KEY`.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            runway: var("RUNWAYML_API_SECRET"),
            openai: var("OPENAI_API_KEY"),
            pollinations: var("POLLINATIONS_API_KEY"),
        }
    }

    fn key(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::Runway => self.runway.as_deref(),
            ProviderId::OpenAi => self.openai.as_deref(),
            ProviderId::Pollinations => self.pollinations.as_deref(),
            _ => None,
        }
    }
}

/// Returns the usable key for a provider: the user key, else the platform
/// key, provided it passes format validation.
///
/// The free tier always resolves (to the platform key or an empty string).
pub fn key_for(
    provider: ProviderId,
    creds: &ProviderCredentials,
    platform: &PlatformKeys,
) -> Option<String> {
    if provider.is_free_tier() {
        return Some(platform.key(provider).unwrap_or_default().to_string());
    }

    creds
        .key(provider)
        .or_else(|| platform.key(provider))
        .filter(|key| validate_api_key(provider, key).valid)
        .map(str::to_string)
}

/// Every provider with a usable key, in availability order, ending with
/// the free tier.
pub fn resolve_available(creds: &ProviderCredentials, platform: &PlatformKeys) -> Vec<ProviderId> {
    ProviderId::ALL
        .into_iter()
        .filter(|p| p.is_free_tier() || key_for(*p, creds, platform).is_some())
        .collect()
}

/// Picks the primary provider.
///
/// Order of precedence: a usable preferred provider, then a premium provider
/// with a key, then the best BYOK provider by priority, then the free tier.
pub fn select_primary(creds: &ProviderCredentials, platform: &PlatformKeys) -> ProviderId {
    let available = resolve_available(creds, platform);

    if let Some(preferred) = creds.preferred_provider() {
        if preferred.is_free_tier() || available.contains(&preferred) {
            return preferred;
        }
    }

    let mut ranked: Vec<&ProviderDescriptor> = available
        .iter()
        .map(|p| p.descriptor())
        .filter(|d| !d.always_available)
        .collect();
    ranked.sort_by_key(|d| (!d.premium, d.priority));

    ranked
        .first()
        .map(|d| d.id)
        .unwrap_or(ProviderId::FREE_TIER)
}

/// Ordered failover candidates: the starting provider (a credentialed
/// override, else the primary), then the remaining available providers.
///
/// Never empty, never contains duplicates, and the free tier is last unless
/// it is the starting provider.
pub fn candidate_order(
    creds: &ProviderCredentials,
    platform: &PlatformKeys,
    provider_override: Option<ProviderId>,
) -> Vec<ProviderId> {
    let available = resolve_available(creds, platform);
    let start = provider_override
        .filter(|p| p.is_free_tier() || available.contains(p))
        .unwrap_or_else(|| select_primary(creds, platform));

    let mut order = Vec::with_capacity(available.len());
    order.push(start);
    order.extend(available.into_iter().filter(|p| *p != start));
    order
}
