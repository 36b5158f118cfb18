use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{ItemError, StoreError};
use crate::models::{ItemSourceRef, WorkItem};
use crate::storage::BlobStore;

/// Raw result of one external call
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPayload {
    pub data: Vec<u8>,
    /// Content type as reported by the external API; checked, not trusted
    pub declared_content_type: Option<String>,
    /// Stage metric reported by the API, e.g. synthesized audio duration in seconds
    pub metric: Option<f64>,
}

impl ItemPayload {
    pub fn new(data: Vec<u8>, declared_content_type: impl Into<String>) -> Self {
        Self {
            data,
            declared_content_type: Some(declared_content_type.into()),
            metric: None,
        }
    }

    pub fn with_metric(mut self, metric: f64) -> Self {
        self.metric = Some(metric);
        self
    }
}

/// Performs one item's external work (page fetch, speech synthesis, ...).
///
/// Called once per attempt; must be safe to call again for the same item.
#[async_trait]
pub trait ItemHandler: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn handle(&self, job_id: &str, item: &WorkItem) -> Result<ItemPayload, ItemError>;
}

/// Fetches page bytes addressed by an item's URL from a [`BlobStore`]
#[derive(Debug, Clone)]
pub struct BlobFetchHandler {
    blobs: Arc<dyn BlobStore>,
}

impl BlobFetchHandler {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl ItemHandler for BlobFetchHandler {
    fn name(&self) -> &str {
        "blob_fetch"
    }

    async fn handle(&self, _job_id: &str, item: &WorkItem) -> Result<ItemPayload, ItemError> {
        let reference = match &item.source {
            ItemSourceRef::Url(reference) if !reference.trim().is_empty() => reference,
            ItemSourceRef::Url(_) => {
                return Err(ItemError::Rejected("item has an empty source URL".to_string()))
            }
            ItemSourceRef::Text(_) => {
                return Err(ItemError::Rejected(
                    "text items cannot be fetched from blob storage".to_string(),
                ))
            }
        };

        match self.blobs.get_bytes(reference).await {
            Ok(data) => Ok(ItemPayload {
                data,
                declared_content_type: None,
                metric: None,
            }),
            Err(StoreError::NotFound(key)) => Err(ItemError::BadStatus {
                status: 404,
                message: format!("no object at {key}"),
            }),
            Err(e) => Err(ItemError::Transport(e.to_string())),
        }
    }
}
