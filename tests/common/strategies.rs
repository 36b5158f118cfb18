use proptest::prelude::*;
use std::time::Duration;

use pacer_core::models::{Metadata, ProcessedResult};

/// Strategy for (total_items, offset) pairs with offset <= total
pub fn progress_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..5_000).prop_flat_map(|total| (Just(total), 0..=total))
}

/// Strategy for invocation budgets up to 15 minutes
pub fn budget_strategy() -> impl Strategy<Value = Duration> {
    (0u64..=900_000).prop_map(Duration::from_millis)
}

/// Strategy for positive per-item estimates
pub fn estimate_strategy() -> impl Strategy<Value = Duration> {
    (1u64..=120_000).prop_map(Duration::from_millis)
}

/// Strategy for a single result with a non-negative metric in quarter seconds
pub fn result_strategy(max_index: usize) -> impl Strategy<Value = ProcessedResult> {
    (0..max_index, 0u32..2_400).prop_map(|(index, quarters)| ProcessedResult {
        index,
        output_key: format!("jobs/j/segments/{index:05}.png"),
        metric: f64::from(quarters) * 0.25,
        metadata: Metadata::new(),
    })
}

/// Strategy for a chunk of results, possibly repeating indices
pub fn chunk_strategy() -> impl Strategy<Value = Vec<ProcessedResult>> {
    prop::collection::vec(result_strategy(64), 0..24)
}
