use serde::{Deserialize, Serialize};

use super::work_item::{Metadata, WorkItem};

/// Keys owned by the result record itself; metadata may not shadow them
const RESERVED_KEYS: [&str; 3] = ["index", "outputKey", "metric"];

/// Output of one successfully processed item, as persisted in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResult {
    pub index: usize,
    pub output_key: String,
    /// Duration in seconds or size in bytes, depending on the stage
    pub metric: f64,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl ProcessedResult {
    /// Build a result for `item`, copying its passthrough metadata
    pub fn for_item(item: &WorkItem, output_key: String, metric: f64) -> Self {
        let metadata = item
            .metadata
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            index: item.index,
            output_key,
            metric,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemSourceRef;
    use serde_json::json;

    #[test]
    fn test_metadata_is_flattened_into_segment() {
        let item = WorkItem::new(2, ItemSourceRef::Text("hello".to_string()))
            .with_metadata("chapterId", json!(4));
        let result = ProcessedResult::for_item(&item, "jobs/a/s/00002.mp3".to_string(), 1.5);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"index": 2, "outputKey": "jobs/a/s/00002.mp3", "metric": 1.5, "chapterId": 4})
        );
    }

    #[test]
    fn test_reserved_metadata_keys_are_dropped() {
        let item = WorkItem::new(1, ItemSourceRef::Text("x".to_string()))
            .with_metadata("metric", json!(999))
            .with_metadata("page", json!(7));
        let result = ProcessedResult::for_item(&item, "k".to_string(), 2.0);

        assert_eq!(result.metric, 2.0);
        assert!(!result.metadata.contains_key("metric"));
        assert_eq!(result.metadata["page"], json!(7));
    }
}
