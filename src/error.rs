//! Error types for video generation and provider failover.

use crate::video::ProviderId;
use std::time::Duration;

/// Maximum length of vendor error text carried in an error value.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Key prefixes that are masked when vendor text is echoed back.
const SECRET_PREFIXES: [&str; 5] = ["sk-", "sk_", "key_", "r8_", "hf_"];

/// Errors that can occur while generating a video.
#[derive(Debug, thiserror::Error)]
pub enum ReelGenError {
    /// Key absent, malformed, or refused by the vendor.
    #[error("credential error: {0}")]
    Credential(String),

    /// Vendor rejected the request (4xx or explicit validation failure).
    #[error("vendor rejected request: {status} - {message}")]
    VendorRejected { status: u16, message: String },

    /// Vendor 5xx, rate limit or other transient condition.
    #[error("vendor transient failure: {0}")]
    VendorTransient(String),

    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Polling ceiling exceeded before the job reached a terminal state.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// Vendor reported the job as failed.
    #[error("job failed: {0}")]
    JobFailed(String),

    /// Vendor reported success but no artifact could be resolved.
    #[error("artifact missing: {0}")]
    ArtifactMissing(String),

    /// Every candidate provider failed.
    #[error("video generation failed with all providers ({attempts} attempted); last error: {last_error}")]
    AggregateFailure {
        attempts: usize,
        last_error: String,
        failures: Vec<ProviderFailure>,
    },

    /// Blob store rejected or failed to persist an artifact.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error (e.g., writing an artifact to disk).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One failed provider attempt, recorded by the failover orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Provider that was attempted.
    pub provider: ProviderId,
    /// Rendered error.
    pub reason: String,
}

impl ReelGenError {
    /// Builds the error for a non-success HTTP response.
    ///
    /// 401/403 are credential problems, 429 and 5xx are transient, every
    /// other status is a rejection of this request.
    pub fn from_status(status: u16, text: &str) -> Self {
        let message = sanitize_error_message(text);
        match status {
            401 | 403 => Self::Credential(message),
            429 => Self::VendorTransient(format!("rate limited: {message}")),
            500..=599 => Self::VendorTransient(format!("{status}: {message}")),
            _ => Self::VendorRejected { status, message },
        }
    }

    /// Returns true if this error is likely transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::VendorTransient(_) | Self::TimedOut(_) => true,
            Self::Network(e) => !e.is_builder() && !e.is_decode(),
            _ => false,
        }
    }
}

/// Trims vendor error text and masks anything that looks like an API key.
pub fn sanitize_error_message(text: &str) -> String {
    let masked: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let bare = word.trim_matches(|c: char| c == '"' || c == '\'' || c == ',');
            match SECRET_PREFIXES.iter().find(|p| bare.starts_with(**p)) {
                Some(prefix) if bare.len() > prefix.len() => word.replace(bare, &format!("{prefix}***")),
                _ => word.to_string(),
            }
        })
        .collect();
    let joined = masked.join(" ");

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

/// Result type alias for video generation operations.
pub type Result<T> = std::result::Result<T, ReelGenError>;
