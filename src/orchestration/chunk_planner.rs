//! # Chunk Planner
//!
//! Decides how many items one invocation may attempt given the time left in
//! its budget. Admission only: an item that was admitted runs to completion
//! even if the estimate turns out optimistic, which is what the safety margin
//! absorbs.

use std::time::Duration;

use crate::models::ChunkPlan;

/// Number of items to attempt starting at `offset`.
///
/// `min(total - offset, floor(budget / estimate))`, but never 0 while work
/// remains so every invocation makes progress. A zero estimate leaves the
/// count unconstrained by the budget.
pub fn plan(
    total_items: usize,
    offset: usize,
    budget: Duration,
    per_item_estimate: Duration,
) -> usize {
    let remaining = total_items.saturating_sub(offset);
    if remaining == 0 {
        return 0;
    }

    let affordable = if per_item_estimate.is_zero() {
        remaining
    } else {
        let count = budget.as_nanos() / per_item_estimate.as_nanos();
        usize::try_from(count).unwrap_or(usize::MAX)
    };

    affordable.min(remaining).max(1)
}

/// [`plan`] wrapped with the offset and expected duration of the chunk
pub fn plan_chunk(
    total_items: usize,
    offset: usize,
    budget: Duration,
    per_item_estimate: Duration,
) -> ChunkPlan {
    let item_count = plan(total_items, offset, budget, per_item_estimate);
    let estimated_duration =
        per_item_estimate.saturating_mul(u32::try_from(item_count).unwrap_or(u32::MAX));

    ChunkPlan {
        start_offset: offset,
        item_count,
        estimated_duration,
    }
}
