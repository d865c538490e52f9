//! Scripted providers for orchestration tests.

use crate::error::{ReelGenError, Result};
use crate::video::{
    Artifact, ArtifactIngestor, CompletedJob, GenerationRequest, JobHandle, JobProvider,
    JobStatus, MemoryBlobStore, PollConfig, ProviderId, StatusTable, VideoProvider,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ErrorFactory = Arc<dyn Fn() -> ReelGenError + Send + Sync>;
type PromptFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

const SCRIPTED_STATUS: StatusTable = StatusTable {
    succeeded: &["succeeded", "completed"],
    failed: &["failed", "canceled"],
};

/// Async-job vendor that replays a fixed status sequence per job.
///
/// `"!transient"` and `"!credential"` make the poll return the matching
/// error instead of a status. The last entry repeats forever.
pub(crate) struct ScriptedJob {
    id: ProviderId,
    statuses: Vec<String>,
    poll_config: PollConfig,
    artifact: bool,
    submit_error: Option<ErrorFactory>,
    positions: Mutex<HashMap<String, usize>>,
    polls: AtomicU32,
    submits: AtomicU32,
}

impl ScriptedJob {
    pub(crate) fn new(id: ProviderId) -> Self {
        Self {
            id,
            statuses: vec!["succeeded".into()],
            poll_config: PollConfig {
                interval: Duration::from_millis(100),
                ceiling: Duration::from_millis(500),
            },
            artifact: true,
            submit_error: None,
            positions: Mutex::new(HashMap::new()),
            polls: AtomicU32::new(0),
            submits: AtomicU32::new(0),
        }
    }

    pub(crate) fn with_statuses(mut self, statuses: &[&str]) -> Self {
        self.statuses = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub(crate) fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    pub(crate) fn without_artifact(mut self) -> Self {
        self.artifact = false;
        self
    }

    pub(crate) fn with_submit_error(
        mut self,
        error: impl Fn() -> ReelGenError + Send + Sync + 'static,
    ) -> Self {
        self.submit_error = Some(Arc::new(error));
        self
    }

    pub(crate) fn poll_calls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_calls(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobProvider for ScriptedJob {
    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn poll_config(&self) -> PollConfig {
        self.poll_config
    }

    async fn submit(&self, _request: &GenerationRequest, _key: &str) -> Result<JobHandle> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.submit_error {
            return Err(error());
        }
        Ok(JobHandle::new(self.id, format!("{}-job-{n}", self.id)))
    }

    async fn poll(&self, handle: &JobHandle, _key: &str) -> Result<JobStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let status = {
            let mut positions = self
                .positions
                .lock()
                .map_err(|_| ReelGenError::VendorTransient("poisoned".into()))?;
            let pos = positions.entry(handle.vendor_job_id.clone()).or_insert(0);
            let status = self.statuses[(*pos).min(self.statuses.len() - 1)].clone();
            *pos += 1;
            status
        };

        match status.as_str() {
            "!transient" => Err(ReelGenError::VendorTransient("503: try again".into())),
            "!credential" => Err(ReelGenError::Credential("key revoked".into())),
            other => Ok(SCRIPTED_STATUS.map(other, || format!("scripted {other}"))),
        }
    }

    async fn fetch(&self, _handle: &JobHandle, _key: &str) -> Result<Option<Artifact>> {
        Ok(self
            .artifact
            .then(|| Artifact::bytes(vec![0u8; 2048], "video/mp4")))
    }
}

/// Shared in-flight counter across scripted providers.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// Blocking-style provider that sleeps, then succeeds or fails.
pub(crate) struct ScriptedClip {
    id: ProviderId,
    delay: Duration,
    failure: Option<ErrorFactory>,
    fails_for: Option<PromptFilter>,
    panics: bool,
    calls: AtomicU32,
    keys: Mutex<Vec<String>>,
    in_flight: Arc<InFlight>,
}

impl ScriptedClip {
    pub(crate) fn new(id: ProviderId) -> Self {
        Self {
            id,
            delay: Duration::ZERO,
            failure: None,
            fails_for: None,
            panics: false,
            calls: AtomicU32::new(0),
            keys: Mutex::new(Vec::new()),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing(mut self, error: impl Fn() -> ReelGenError + Send + Sync + 'static) -> Self {
        self.failure = Some(Arc::new(error));
        self
    }

    /// Restricts [`failing`](Self::failing) to prompts matching `filter`.
    pub(crate) fn only_for(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.fails_for = Some(Arc::new(filter));
        self
    }

    pub(crate) fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub(crate) fn with_in_flight(mut self, in_flight: Arc<InFlight>) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.keys.lock().map(|k| k.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VideoProvider for ScriptedClip {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn generate(&self, request: &GenerationRequest, key: &str) -> Result<CompletedJob> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut keys) = self.keys.lock() {
            keys.push(key.to_string());
        }
        if self.panics {
            panic!("scripted panic in {}", self.id);
        }

        self.in_flight.enter();
        tokio::time::sleep(self.delay).await;
        self.in_flight.exit();

        let applies = self
            .fails_for
            .as_ref()
            .map_or(true, |filter| filter(&request.prompt));
        if let (Some(error), true) = (&self.failure, applies) {
            return Err(error());
        }
        Ok(CompletedJob {
            handle: JobHandle::new(self.id, format!("{}-clip-{n}", self.id)),
            artifact: Artifact::url(format!("https://cdn.test/{}/{n}.mp4", self.id)),
            duration_secs: request.duration_secs,
        })
    }
}

pub(crate) fn memory_ingestor() -> ArtifactIngestor {
    ArtifactIngestor::new(Arc::new(MemoryBlobStore::new()))
}

pub(crate) fn rejected() -> ReelGenError {
    ReelGenError::VendorRejected {
        status: 400,
        message: "unsupported prompt".into(),
    }
}
