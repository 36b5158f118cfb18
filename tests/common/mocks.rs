use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use pacer_core::config::PacerConfig;
use pacer_core::constants::JobStatus;
use pacer_core::error::{ItemError, StoreError, StoreResult};
use pacer_core::models::{ItemSourceRef, JobRecord, StatusUpdate, WorkItem};
use pacer_core::orchestration::ContinuationController;
use pacer_core::processing::{ItemHandler, ItemPayload};
use pacer_core::storage::{BlobStore, InMemoryBlobStore, InMemoryJobStore, ItemSource, JobStore};

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
pub const SOURCE_KEY: &str = "sources/job.json";

/// What the mock API returns for one index
#[derive(Debug, Clone)]
pub enum Response {
    Png,
    /// An error page served as `image/png`
    HtmlAsPng,
    Error(ItemError),
}

/// Page API stand-in: PNG for every index unless scripted otherwise
#[derive(Debug, Default)]
pub struct MockPageApi {
    responses: HashMap<usize, Response>,
    calls: Mutex<Vec<(usize, Instant)>>,
}

impl MockPageApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, index: usize, response: Response) -> Self {
        self.responses.insert(index, response);
        self
    }

    pub fn calls(&self) -> Vec<(usize, Instant)> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, index: usize) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| *called == index)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl ItemHandler for MockPageApi {
    fn name(&self) -> &str {
        "mock_page_api"
    }

    async fn handle(&self, _job_id: &str, item: &WorkItem) -> Result<ItemPayload, ItemError> {
        self.calls.lock().push((item.index, Instant::now()));

        match self.responses.get(&item.index).cloned().unwrap_or(Response::Png) {
            Response::Png => Ok(ItemPayload::new(PNG_BYTES.to_vec(), "image/png")),
            Response::HtmlAsPng => Ok(ItemPayload::new(
                b"<html><body>Too many requests</body></html>".to_vec(),
                "image/png",
            )),
            Response::Error(error) => Err(error),
        }
    }
}

/// Fixed list of page items
#[derive(Debug)]
pub struct StaticItemSource {
    items: Vec<WorkItem>,
    load_delay: Duration,
}

impl StaticItemSource {
    pub fn pages(count: usize) -> Self {
        let items = (0..count)
            .map(|index| {
                WorkItem::new(index, ItemSourceRef::Url(format!("https://cdn.test/p{index}.png")))
                    .with_metadata("page", serde_json::json!(index + 1))
            })
            .collect();
        Self {
            items,
            load_delay: Duration::ZERO,
        }
    }

    /// Spend `delay` of the invocation before returning the items
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }
}

#[async_trait]
impl ItemSource for StaticItemSource {
    async fn load_items(&self, _job_id: &str, _key: &str) -> StoreResult<Vec<WorkItem>> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        Ok(self.items.clone())
    }
}

/// Blob store whose manifest reads or writes can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyBlobStore {
    pub inner: InMemoryBlobStore,
    fail_manifest_reads: AtomicBool,
    fail_manifest_writes: AtomicBool,
}

impl FlakyBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_manifest_reads(&self, fail: bool) {
        self.fail_manifest_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_manifest_writes(&self, fail: bool) {
        self.fail_manifest_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn get_bytes(&self, reference: &str) -> StoreResult<Vec<u8>> {
        if reference.ends_with("manifest.json") && self.fail_manifest_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read timed out".to_string()));
        }
        self.inner.get_bytes(reference).await
    }

    async fn put_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StoreResult<()> {
        if key.ends_with("manifest.json") && self.fail_manifest_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("bucket unavailable".to_string()));
        }
        self.inner.put_bytes(data, key, content_type).await
    }

    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.list_keys(prefix).await
    }
}

/// Job store whose status updates always fail
#[derive(Debug, Default)]
pub struct ReadOnlyJobStore {
    pub inner: InMemoryJobStore,
}

#[async_trait]
impl JobStore for ReadOnlyJobStore {
    async fn get_job(&self, job_id: &str) -> StoreResult<Option<JobRecord>> {
        self.inner.get_job(job_id).await
    }

    async fn update_status(&self, _job_id: &str, _update: StatusUpdate) -> StoreResult<()> {
        Err(StoreError::Backend("job table is read-only".to_string()))
    }
}

/// Config whose budget admits exactly `items` items at a 6s estimate.
///
/// Half an item of slack keeps the count stable while less than 3s has
/// elapsed before planning.
pub fn config_admitting(items: u64) -> PacerConfig {
    let mut config = PacerConfig::default();
    config.chunking.safety_margin_secs = 120;
    config.chunking.per_item_estimate_ms = 6_000;
    config.chunking.invocation_budget_secs = 120 + items * 6 + 3;
    config
}

pub struct Harness {
    pub blobs: Arc<FlakyBlobStore>,
    pub jobs: Arc<InMemoryJobStore>,
    pub api: Arc<MockPageApi>,
    pub controller: ContinuationController,
}

impl Harness {
    pub fn new(items: usize, api: MockPageApi, config: PacerConfig) -> Self {
        let blobs = Arc::new(FlakyBlobStore::new());
        let jobs = Arc::new(InMemoryJobStore::new());
        jobs.insert(JobRecord::new("job-1", JobStatus::Pending));
        let api = Arc::new(api);

        let controller = ContinuationController::new(
            config,
            blobs.clone(),
            jobs.clone(),
            Arc::new(StaticItemSource::pages(items)),
            api.clone(),
        )
        .expect("valid test config");

        Self {
            blobs,
            jobs,
            api,
            controller,
        }
    }

    pub fn manifest_bytes(&self) -> Option<Vec<u8>> {
        self.blobs
            .inner
            .object("jobs/job-1/segments/manifest.json")
            .map(|object| object.data)
    }
}
