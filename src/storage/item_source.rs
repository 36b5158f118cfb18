use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

use super::blob_store::BlobStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{ItemSourceRef, Metadata, WorkItem};

/// Produces the ordered work items of a job
#[async_trait]
pub trait ItemSource: Send + Sync + Debug {
    async fn load_items(&self, job_id: &str, source_manifest_key: &str)
        -> StoreResult<Vec<WorkItem>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceManifest {
    #[serde(default)]
    job_id: Option<String>,
    items: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(flatten)]
    metadata: Metadata,
}

/// Reads a source manifest of the form
/// `{"jobId": "...", "items": [{"url": "..."} | {"text": "..."}, ...]}`
/// from a blob store. Item indices are positions in `items`; every other key
/// on an entry becomes passthrough metadata.
#[derive(Debug, Clone)]
pub struct ManifestItemSource {
    blobs: Arc<dyn BlobStore>,
}

impl ManifestItemSource {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    fn to_work_items(key: &str, manifest: SourceManifest) -> StoreResult<Vec<WorkItem>> {
        manifest
            .items
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let source = match (entry.url, entry.text) {
                    (Some(url), None) => ItemSourceRef::Url(url),
                    (None, Some(text)) => ItemSourceRef::Text(text),
                    _ => {
                        return Err(StoreError::serialization(
                            key,
                            format!("item {index} must have exactly one of 'url' or 'text'"),
                        ))
                    }
                };
                Ok(WorkItem {
                    index,
                    source,
                    metadata: entry.metadata,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ItemSource for ManifestItemSource {
    async fn load_items(
        &self,
        job_id: &str,
        source_manifest_key: &str,
    ) -> StoreResult<Vec<WorkItem>> {
        let value = self.blobs.get_json(source_manifest_key).await?;
        let manifest: SourceManifest = serde_json::from_value(value)
            .map_err(|e| StoreError::serialization(source_manifest_key, e))?;

        if let Some(owner) = manifest.job_id.as_deref() {
            if owner != job_id {
                return Err(StoreError::serialization(
                    source_manifest_key,
                    format!("source manifest belongs to job {owner}, not {job_id}"),
                ));
            }
        }

        let items = Self::to_work_items(source_manifest_key, manifest)?;
        debug!(job_id = %job_id, items = items.len(), "Loaded work items");
        Ok(items)
    }
}
