//! # Processing Manifest
//!
//! The checkpoint record of everything a job has produced so far. It is the
//! only state that crosses invocation boundaries besides the offset.
//!
//! Invariants maintained by every constructor and mutation:
//!
//! - `segments` is strictly ascending by `index`
//! - `total_metric` is the exact sum of segment metrics, recomputed rather
//!   than accumulated

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::processed_result::ProcessedResult;

/// Persisted manifest shape: `{jobId, segments: [...], totalMetric}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingManifest {
    job_id: String,
    segments: Vec<ProcessedResult>,
    total_metric: f64,
}

/// What a merge did to the manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Results for indices not previously present
    pub appended: usize,
    /// Results that overwrote an existing index (at-least-once re-runs)
    pub replaced: usize,
}

impl ProcessingManifest {
    /// Empty manifest, used before the first invocation
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            segments: Vec::new(),
            total_metric: 0.0,
        }
    }

    /// Parse a persisted manifest, normalizing it to the invariants.
    ///
    /// Rejects documents that are structurally invalid or list the same index
    /// twice. An out-of-order segment list is sorted, and the stored total is
    /// discarded in favor of a fresh sum.
    pub fn from_value(value: serde_json::Value) -> Result<Self, String> {
        let mut manifest: ProcessingManifest =
            serde_json::from_value(value).map_err(|e| e.to_string())?;

        manifest.segments.sort_by_key(|segment| segment.index);
        if let Some(pair) = manifest
            .segments
            .windows(2)
            .find(|pair| pair[0].index == pair[1].index)
        {
            return Err(format!("duplicate segment index {}", pair[0].index));
        }

        let stored_total = manifest.total_metric;
        manifest.recompute_total();
        if (stored_total - manifest.total_metric).abs() > 1e-6 {
            tracing::warn!(
                job_id = %manifest.job_id,
                stored_total = stored_total,
                recomputed_total = manifest.total_metric,
                "Persisted manifest total disagreed with its segments; using recomputed total"
            );
        }

        Ok(manifest)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn segments(&self) -> &[ProcessedResult] {
        &self.segments
    }

    pub fn total_metric(&self) -> f64 {
        self.total_metric
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn max_index(&self) -> Option<usize> {
        self.segments.last().map(|segment| segment.index)
    }

    pub fn contains_index(&self, index: usize) -> bool {
        self.segments
            .binary_search_by_key(&index, |segment| segment.index)
            .is_ok()
    }

    /// Merge newly produced results into the manifest.
    ///
    /// New results land in index order. A result for an index already present
    /// replaces it in place, so re-running a chunk never duplicates segments.
    pub fn merge(&mut self, results: Vec<ProcessedResult>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        if results.is_empty() {
            self.recompute_total();
            return summary;
        }

        let mut by_index: BTreeMap<usize, ProcessedResult> = self
            .segments
            .drain(..)
            .map(|segment| (segment.index, segment))
            .collect();

        for result in results {
            match by_index.insert(result.index, result) {
                Some(_) => summary.replaced += 1,
                None => summary.appended += 1,
            }
        }

        self.segments = by_index.into_values().collect();
        self.recompute_total();
        summary
    }

    /// Canonical JSON value used for persistence
    pub fn to_value(&self) -> serde_json::Value {
        // Serializing plain data with string keys cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn recompute_total(&mut self) {
        self.total_metric = self.segments.iter().map(|segment| segment.metric).sum();
    }
}
