use serde::{Deserialize, Serialize};

/// Passthrough metadata (e.g. `chapterId`) copied verbatim onto results
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// What an item's external call operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSourceRef {
    /// A page image or other remote resource
    Url(String),
    /// A text segment, e.g. for speech synthesis
    Text(String),
}

impl ItemSourceRef {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(value) | Self::Text(value) => value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

/// One unit of rate-limited external work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Position in the job's global ordered sequence
    pub index: usize,
    pub source: ItemSourceRef,
    #[serde(default)]
    pub metadata: Metadata,
}

impl WorkItem {
    pub fn new(index: usize, source: ItemSourceRef) -> Self {
        Self {
            index,
            source,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}
