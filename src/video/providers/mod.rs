//! Video generation providers.

use crate::error::{ReelGenError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

mod pollinations;
pub use pollinations::{PollinationsModel, PollinationsProvider, PollinationsProviderBuilder};

#[cfg(feature = "runway")]
mod runway;
#[cfg(feature = "runway")]
pub use runway::{RunwayProvider, RunwayProviderBuilder};

#[cfg(feature = "openai")]
mod openai;
#[cfg(feature = "openai")]
pub use openai::{SoraModel, SoraProvider, SoraProviderBuilder};

#[cfg(feature = "replicate")]
mod replicate;
#[cfg(feature = "replicate")]
pub use replicate::{ReplicateProvider, ReplicateProviderBuilder};

#[cfg(feature = "fal")]
mod fal;
#[cfg(feature = "fal")]
pub use fal::{FalVideoProvider, FalVideoProviderBuilder};

#[cfg(feature = "luma")]
mod luma;
#[cfg(feature = "luma")]
pub use luma::{LumaProvider, LumaProviderBuilder};

#[cfg(feature = "huggingface")]
mod huggingface;
#[cfg(feature = "huggingface")]
pub use huggingface::{HuggingFaceProvider, HuggingFaceProviderBuilder};

/// Turns a non-success response into the matching error.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(ReelGenError::from_status(status.as_u16(), &text))
}

/// Parses `base` + `path` into a URL.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<reqwest::Url> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    reqwest::Url::parse(&joined)
        .map_err(|e| ReelGenError::InvalidRequest(format!("bad endpoint {joined}: {e}")))
}

static LOCAL_JOB_SEQ: AtomicU64 = AtomicU64::new(0);

/// Job id for vendors that answer synchronously and issue none.
///
/// Unique per call within the process, even inside one millisecond.
pub(crate) fn local_job_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = LOCAL_JOB_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{millis}-{seq}")
}

/// Frame count for vendors that take frames instead of seconds (8 fps).
pub(crate) fn frames_for(duration_secs: u32, max_frames: u32) -> u32 {
    duration_secs.saturating_mul(8).clamp(1, max_frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_slashes() {
        let url = endpoint("https://api.example.com/v1/", "/tasks/abc").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/tasks/abc");
        assert!(endpoint("not a url", "x").is_err());
    }

    #[test]
    fn test_frames_for() {
        assert_eq!(frames_for(5, 81), 40);
        assert_eq!(frames_for(20, 81), 81);
        assert_eq!(frames_for(0, 81), 1);
    }

    #[test]
    fn test_local_job_id_prefix() {
        assert!(local_job_id("hf").starts_with("hf-"));
    }

    #[test]
    fn test_local_job_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| local_job_id("pollinations")).collect();
        assert_eq!(ids.len(), 1000);
    }
}
