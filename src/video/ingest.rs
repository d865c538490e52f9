//! Artifact ingestion into a caller-provided blob store.

use crate::error::{ReelGenError, Result};
use crate::video::types::{ArtifactSource, CompletedJob};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Persistent storage for generated clips.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` under `filename` and returns a stable URL.
    async fn put(&self, data: Vec<u8>, filename: &str, content_type: &str) -> Result<String>;
}

/// Writes clips into a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FsBlobStore {
    /// Stores files under `root`, created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
        }
    }

    /// Returns `{base}/{filename}` instead of a `file://` URL.
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into());
        self
    }

    /// Directory files are written to.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, data: Vec<u8>, filename: &str, _content_type: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(filename);
        tokio::fs::write(&path, &data).await?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "stored artifact");

        if let Some(base) = &self.public_base_url {
            return Ok(format!("{}/{}", base.trim_end_matches('/'), filename));
        }

        let absolute = tokio::fs::canonicalize(&path).await?;
        reqwest::Url::from_file_path(&absolute)
            .map(|url| url.to_string())
            .map_err(|_| ReelGenError::Storage(format!("not an absolute path: {}", absolute.display())))
    }
}

/// Keeps clips in memory. Handy for tests and short-lived callers.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored blob and its content type.
    pub fn get(&self, filename: &str) -> Option<(Vec<u8>, String)> {
        self.blobs
            .lock()
            .ok()
            .and_then(|blobs| blobs.get(filename).cloned())
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or_default()
    }

    /// Returns true when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Vec<u8>, filename: &str, content_type: &str) -> Result<String> {
        self.blobs
            .lock()
            .map_err(|_| ReelGenError::Storage("memory store poisoned".into()))?
            .insert(filename.to_string(), (data, content_type.to_string()));
        Ok(format!("memory://{filename}"))
    }
}

/// Where an ingested clip ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedArtifact {
    /// Stable URL of the clip.
    pub url: String,
    /// Vendor thumbnail, passed through.
    pub thumbnail_url: Option<String>,
}

/// Turns a resolved artifact into a stable URL.
///
/// Inline bytes always go to the blob store. Vendor URLs are passed through
/// unless re-hosting is enabled, in which case they are downloaded first.
#[derive(Clone)]
pub struct ArtifactIngestor {
    store: Arc<dyn BlobStore>,
    client: reqwest::Client,
    rehost_urls: bool,
}

impl std::fmt::Debug for ArtifactIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactIngestor")
            .field("rehost_urls", &self.rehost_urls)
            .finish_non_exhaustive()
    }
}

impl ArtifactIngestor {
    /// Creates an ingestor writing to `store`.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            client: reqwest::Client::new(),
            rehost_urls: false,
        }
    }

    /// Download vendor URLs and store them too (vendor links often expire).
    pub fn rehost_urls(mut self, rehost: bool) -> Self {
        self.rehost_urls = rehost;
        self
    }

    /// Ingests the artifact of a completed job.
    pub async fn ingest(&self, job: &CompletedJob) -> Result<IngestedArtifact> {
        let thumbnail_url = job.artifact.thumbnail_url.clone();

        let url = match &job.artifact.source {
            ArtifactSource::Bytes { data, content_type } => {
                self.store_bytes(job, data.clone(), content_type).await?
            }
            ArtifactSource::Url(url) if self.rehost_urls => {
                let (data, content_type) = self.download(url).await?;
                self.store_bytes(job, data, &content_type).await?
            }
            ArtifactSource::Url(url) => url.clone(),
        };

        Ok(IngestedArtifact { url, thumbnail_url })
    }

    async fn store_bytes(&self, job: &CompletedJob, data: Vec<u8>, content_type: &str) -> Result<String> {
        if data.is_empty() {
            return Err(ReelGenError::ArtifactMissing(format!(
                "{} returned an empty video body",
                job.handle.provider
            )));
        }
        let filename = artifact_filename(job, content_type);
        self.store.put(data, &filename, content_type).await
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, String)> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReelGenError::ArtifactMissing(format!(
                "download of {url} failed with {status}"
            )));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|ct| ct.starts_with("video/"))
            .unwrap_or("video/mp4")
            .to_string();
        Ok((response.bytes().await?.to_vec(), content_type))
    }
}

fn artifact_filename(job: &CompletedJob, content_type: &str) -> String {
    let job_id: String = job
        .handle
        .vendor_job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let ext = match content_type.split(';').next().map(str::trim) {
        Some("video/webm") => "webm",
        Some("video/quicktime") => "mov",
        _ => "mp4",
    };
    format!("{}-{}.{}", job.handle.provider, job_id, ext)
}
