//! # Checkpoint Store
//!
//! Load and persist a job's [`ProcessingManifest`] at its stable key.
//! Persistence is a full overwrite, so re-running an invocation is idempotent.

use std::sync::Arc;
use tracing::{debug, instrument};

use super::blob_store::BlobStore;
use crate::config::CheckpointConfig;
use crate::constants::keys;
use crate::error::{CheckpointError, StoreError};
use crate::models::ProcessingManifest;

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    blobs: Arc<dyn BlobStore>,
    key_prefix: String,
    stage: String,
}

impl CheckpointStore {
    pub fn new(blobs: Arc<dyn BlobStore>, config: &CheckpointConfig) -> Self {
        Self {
            blobs,
            key_prefix: config.key_prefix.clone(),
            stage: config.stage.clone(),
        }
    }

    /// Stable manifest key for a job
    pub fn manifest_key(&self, job_id: &str) -> String {
        keys::manifest_key(&self.key_prefix, job_id, &self.stage)
    }

    /// Load the persisted manifest.
    ///
    /// Distinguishes a checkpoint that was never written ([`CheckpointError::Missing`])
    /// from one that exists but cannot be trusted ([`CheckpointError::Corrupt`]).
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn load(&self, job_id: &str) -> Result<ProcessingManifest, CheckpointError> {
        let key = self.manifest_key(job_id);

        let value = match self.blobs.get_json(&key).await {
            Ok(value) => value,
            Err(StoreError::NotFound(_)) => return Err(CheckpointError::Missing { key }),
            Err(StoreError::Serialization { reason, .. }) => {
                return Err(CheckpointError::Corrupt { key, reason })
            }
            Err(e) => return Err(CheckpointError::Store(e)),
        };

        let manifest = ProcessingManifest::from_value(value)
            .map_err(|reason| CheckpointError::Corrupt {
                key: key.clone(),
                reason,
            })?;

        if manifest.job_id() != job_id {
            return Err(CheckpointError::Corrupt {
                key,
                reason: format!("manifest belongs to job {}", manifest.job_id()),
            });
        }

        debug!(
            job_id = %job_id,
            segments = manifest.len(),
            total_metric = manifest.total_metric(),
            "Loaded checkpoint"
        );
        Ok(manifest)
    }

    /// Overwrite the manifest at the job's stable key, returning the key
    #[instrument(skip(self, manifest), fields(job_id = %manifest.job_id()))]
    pub async fn save(&self, manifest: &ProcessingManifest) -> Result<String, StoreError> {
        let key = self.manifest_key(manifest.job_id());
        self.blobs.put_json(&key, &manifest.to_value()).await?;

        debug!(
            key = %key,
            segments = manifest.len(),
            total_metric = manifest.total_metric(),
            "Persisted checkpoint"
        );
        Ok(key)
    }
}
