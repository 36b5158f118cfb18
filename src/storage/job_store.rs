use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

use super::blob_store::BlobStore;
use crate::constants::keys;
use crate::error::{StoreError, StoreResult};
use crate::models::{JobRecord, StatusUpdate};

/// Job-record persistence owned by the outer pipeline
#[async_trait]
pub trait JobStore: Send + Sync + Debug {
    async fn get_job(&self, job_id: &str) -> StoreResult<Option<JobRecord>>;

    async fn update_status(&self, job_id: &str, update: StatusUpdate) -> StoreResult<()>;
}

/// Process-local job store that also keeps every update it served
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    records: RwLock<HashMap<String, JobRecord>>,
    history: Mutex<Vec<(String, StatusUpdate)>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: JobRecord) {
        self.records.write().insert(record.job_id.clone(), record);
    }

    pub fn record(&self, job_id: &str) -> Option<JobRecord> {
        self.records.read().get(job_id).cloned()
    }

    /// All status updates applied, oldest first
    pub fn history(&self) -> Vec<(String, StatusUpdate)> {
        self.history.lock().clone()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get_job(&self, job_id: &str) -> StoreResult<Option<JobRecord>> {
        Ok(self.record(job_id))
    }

    async fn update_status(&self, job_id: &str, update: StatusUpdate) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        record.apply(&update);
        self.history.lock().push((job_id.to_string(), update));
        Ok(())
    }
}

/// Job records kept as JSON documents in a [`BlobStore`]
#[derive(Debug, Clone)]
pub struct BlobJobStore {
    blobs: Arc<dyn BlobStore>,
    key_prefix: String,
}

impl BlobJobStore {
    pub fn new(blobs: Arc<dyn BlobStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            blobs,
            key_prefix: key_prefix.into(),
        }
    }

    pub async fn create_job(&self, record: &JobRecord) -> StoreResult<()> {
        let key = keys::job_record_key(&self.key_prefix, &record.job_id);
        let value = serde_json::to_value(record).map_err(|e| StoreError::serialization(&key, e))?;
        self.blobs.put_json(&key, &value).await
    }

    /// Every readable job record under the prefix; unreadable ones are logged
    /// and skipped
    pub async fn list_jobs(&self) -> StoreResult<Vec<JobRecord>> {
        let suffix = format!("/{}", keys::JOB_RECORD_FILE);
        let mut records = Vec::new();

        for key in self.blobs.list_keys(&format!("{}/", self.key_prefix)).await? {
            if !key.ends_with(&suffix) {
                continue;
            }
            match self.read(&key).await {
                Ok(record) => records.push(record),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable job record"),
            }
        }

        Ok(records)
    }

    async fn read(&self, key: &str) -> StoreResult<JobRecord> {
        let value = self.blobs.get_json(key).await?;
        serde_json::from_value(value).map_err(|e| StoreError::serialization(key, e))
    }
}

#[async_trait]
impl JobStore for BlobJobStore {
    async fn get_job(&self, job_id: &str) -> StoreResult<Option<JobRecord>> {
        match self
            .read(&keys::job_record_key(&self.key_prefix, job_id))
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_status(&self, job_id: &str, update: StatusUpdate) -> StoreResult<()> {
        let mut record = self
            .get_job(job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        record.apply(&update);
        self.create_job(&record).await
    }
}
