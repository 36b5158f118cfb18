mod common;

use common::strategies::{budget_strategy, chunk_strategy, estimate_strategy, progress_strategy};
use proptest::prelude::*;

use pacer_core::models::ProcessingManifest;
use pacer_core::orchestration::{plan, plan_chunk};

proptest! {
    /// Property: a chunk never exceeds the remaining items and always makes progress
    #[test]
    fn plan_stays_within_remaining_items(
        (total, offset) in progress_strategy(),
        budget in budget_strategy(),
        estimate in estimate_strategy(),
    ) {
        let count = plan(total, offset, budget, estimate);
        let remaining = total - offset;

        if remaining == 0 {
            prop_assert_eq!(count, 0);
        } else {
            prop_assert!(count >= 1);
            prop_assert!(count <= remaining);
        }
    }

    /// Property: when the budget binds, the count is exactly floor(budget / estimate)
    #[test]
    fn plan_matches_affordable_count_when_budget_binds(
        (total, offset) in progress_strategy(),
        budget in budget_strategy(),
        estimate in estimate_strategy(),
    ) {
        let affordable = (budget.as_millis() / estimate.as_millis()) as usize;
        let remaining = total - offset;
        prop_assume!(affordable >= 1 && affordable < remaining);

        prop_assert_eq!(plan(total, offset, budget, estimate), affordable);
    }

    /// Property: a planned chunk ends inside the job
    #[test]
    fn plan_chunk_end_offset_is_bounded(
        (total, offset) in progress_strategy(),
        budget in budget_strategy(),
        estimate in estimate_strategy(),
    ) {
        let chunk = plan_chunk(total, offset, budget, estimate);
        prop_assert_eq!(chunk.start_offset, offset);
        prop_assert!(chunk.end_offset() <= total);
    }

    /// Property: merged segments strictly ascend and the total is their exact sum
    #[test]
    fn merge_keeps_order_and_total(chunks in prop::collection::vec(chunk_strategy(), 1..6)) {
        let mut manifest = ProcessingManifest::new("j");
        for chunk in chunks {
            manifest.merge(chunk);

            let segments = manifest.segments();
            prop_assert!(segments.windows(2).all(|pair| pair[0].index < pair[1].index));

            let sum: f64 = segments.iter().map(|segment| segment.metric).sum();
            prop_assert!((manifest.total_metric() - sum).abs() < 1e-6);
        }
    }

    /// Property: earlier segments survive later merges
    #[test]
    fn merge_never_loses_prior_indices(first in chunk_strategy(), second in chunk_strategy()) {
        let mut manifest = ProcessingManifest::new("j");
        manifest.merge(first.clone());
        manifest.merge(second);

        for result in &first {
            prop_assert!(manifest.contains_index(result.index));
        }
    }

    /// Property: serializing the same manifest twice is byte-identical
    #[test]
    fn manifest_serialization_is_deterministic(chunk in chunk_strategy()) {
        let mut manifest = ProcessingManifest::new("j");
        manifest.merge(chunk);

        let first = serde_json::to_vec(&manifest.to_value()).unwrap();
        let reloaded = ProcessingManifest::from_value(manifest.to_value()).unwrap();
        let second = serde_json::to_vec(&reloaded.to_value()).unwrap();
        prop_assert_eq!(first, second);
    }
}
