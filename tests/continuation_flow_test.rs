mod common;

use std::time::Duration;

use common::mocks::{
    config_admitting, FlakyBlobStore, Harness, MockPageApi, ReadOnlyJobStore, Response,
    StaticItemSource, PNG_BYTES, SOURCE_KEY,
};
use pacer_core::config::PacerConfig;
use pacer_core::constants::JobStatus;
use pacer_core::error::{ItemError, PacerError};
use pacer_core::models::{InvocationInput, JobRecord, ProcessingManifest};
use pacer_core::orchestration::ContinuationController;
use pacer_core::storage::{BlobStore, InMemoryJobStore};
use std::sync::Arc;

fn input(offset: usize) -> InvocationInput {
    InvocationInput::new("job-1", SOURCE_KEY).at_offset(offset)
}

async fn persisted_manifest(harness: &Harness) -> ProcessingManifest {
    let value = harness
        .blobs
        .get_json("jobs/job-1/segments/manifest.json")
        .await
        .unwrap();
    ProcessingManifest::from_value(value).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_item_failing_validation_is_skipped_and_counted() {
    let harness = Harness::new(
        5,
        MockPageApi::new().respond(2, Response::HtmlAsPng),
        PacerConfig::default(),
    );

    let output = harness.controller.run(&input(0)).await.unwrap();

    assert_eq!(output.segments_processed, 4);
    assert_eq!(output.segments_attempted, 5);
    assert_eq!(output.failed_indices, vec![2]);
    assert_eq!(output.total_segments, 5);
    assert!(!output.continuation_needed);
    assert_eq!(output.next_offset, None);

    let manifest = persisted_manifest(&harness).await;
    let indices: Vec<usize> = manifest.segments().iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 3, 4]);
    assert_eq!(manifest.total_metric(), 4.0 * PNG_BYTES.len() as f64);
    assert_eq!(manifest.segments()[0].metadata["page"], serde_json::json!(1));

    assert_eq!(harness.api.calls_for(2).len(), 3);
    assert!(!harness.blobs.inner.contains("jobs/job-1/segments/00002.png"));
    assert!(harness.blobs.inner.contains("jobs/job-1/segments/00003.png"));

    let record = harness.jobs.record("job-1").unwrap();
    assert_eq!(record.parsed_status(), Some(JobStatus::StageComplete));
    assert_eq!(record.progress_pct, Some(60));
}

#[tokio::test(start_paused = true)]
async fn test_budget_splits_job_across_invocations() {
    let harness = Harness::new(200, MockPageApi::new(), config_admitting(120));

    let first = harness.controller.run(&input(0)).await.unwrap();
    assert!(first.continuation_needed);
    assert_eq!(first.next_offset, Some(120));
    assert_eq!(first.segments_processed, 120);
    assert_eq!(first.total_segments, 200);

    let record = harness.jobs.record("job-1").unwrap();
    assert_eq!(record.parsed_status(), Some(JobStatus::Processing));
    // 10 + (60 - 10) * 120 / 200
    assert_eq!(record.progress_pct, Some(40));

    let next = first.next_input(SOURCE_KEY).unwrap();
    let second = harness.controller.run(&next).await.unwrap();
    assert!(!second.continuation_needed);
    assert_eq!(second.next_offset, None);
    assert_eq!(second.segments_processed, 80);

    let manifest = persisted_manifest(&harness).await;
    assert_eq!(manifest.len(), 200);
    assert!(manifest
        .segments()
        .windows(2)
        .all(|pair| pair[0].index < pair[1].index));
}

#[tokio::test(start_paused = true)]
async fn test_time_spent_before_planning_shrinks_the_chunk() {
    let jobs = Arc::new(InMemoryJobStore::new());
    jobs.insert(JobRecord::new("job-1", JobStatus::Pending));
    let controller = ContinuationController::new(
        config_admitting(5),
        Arc::new(FlakyBlobStore::new()),
        jobs,
        Arc::new(StaticItemSource::pages(10).with_load_delay(Duration::from_secs(12))),
        Arc::new(MockPageApi::new()),
    )
    .unwrap();

    let output = controller.run(&input(0)).await.unwrap();

    // 33s of budget less 12s spent loading leaves room for 3 items at 6s
    assert_eq!(output.segments_attempted, 3);
    assert_eq!(output.segments_processed, 3);
    assert!(output.continuation_needed);
    assert_eq!(output.next_offset, Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_calls_respect_rate_limit_interval() {
    let harness = Harness::new(6, MockPageApi::new(), PacerConfig::default());

    harness.controller.run(&input(0)).await.unwrap();

    let calls = harness.api.calls();
    assert_eq!(calls.len(), 6);
    for pair in calls.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(1));
    }
    assert!(calls[5].1 - calls[0].1 >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_rerunning_a_chunk_is_idempotent() {
    let harness = Harness::new(4, MockPageApi::new(), PacerConfig::default());

    harness.controller.run(&input(0)).await.unwrap();
    let first = harness.manifest_bytes().unwrap();

    harness.controller.run(&input(0)).await.unwrap();
    let second = harness.manifest_bytes().unwrap();

    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn test_rerun_after_partial_progress_does_not_duplicate() {
    let harness = Harness::new(10, MockPageApi::new(), config_admitting(4));

    let first = harness.controller.run(&input(0)).await.unwrap();
    let second = harness
        .controller
        .run(&first.next_input(SOURCE_KEY).unwrap())
        .await
        .unwrap();
    // The caller retries the same continuation
    harness
        .controller
        .run(&first.next_input(SOURCE_KEY).unwrap())
        .await
        .unwrap();

    assert_eq!(second.next_offset, Some(8));
    let manifest = persisted_manifest(&harness).await;
    assert_eq!(manifest.len(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_missing_checkpoint_on_continuation_starts_empty() {
    let harness = Harness::new(10, MockPageApi::new(), config_admitting(5));

    let output = harness.controller.run(&input(5)).await.unwrap();

    assert!(!output.continuation_needed);
    let manifest = persisted_manifest(&harness).await;
    let indices: Vec<usize> = manifest.segments().iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![5, 6, 7, 8, 9]);
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_checkpoint_is_tolerated_by_default() {
    let harness = Harness::new(3, MockPageApi::new(), PacerConfig::default());
    harness.blobs.inner.insert(
        "jobs/job-1/segments/manifest.json",
        b"{\"jobId\": \"job-1\", \"segm".to_vec(),
        "application/json",
    );

    let output = harness.controller.run(&input(1)).await.unwrap();
    assert_eq!(output.segments_processed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_checkpoint_is_fatal_when_strict() {
    let mut config = PacerConfig::default();
    config.checkpoint.strict = true;
    let harness = Harness::new(3, MockPageApi::new(), config);
    harness.blobs.inner.insert(
        "jobs/job-1/segments/manifest.json",
        b"not json".to_vec(),
        "application/json",
    );

    let err = harness.controller.run(&input(1)).await.unwrap_err();

    assert!(matches!(err, PacerError::CheckpointLoad(_)));
    assert!(harness.api.calls().is_empty());
    let record = harness.jobs.record("job-1").unwrap();
    assert_eq!(record.parsed_status(), Some(JobStatus::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_read_error_is_fatal_even_when_tolerant() {
    let harness = Harness::new(3, MockPageApi::new(), PacerConfig::default());
    harness.controller.run(&input(0)).await.unwrap();
    let good = harness.manifest_bytes().unwrap();
    assert!(!harness.controller.config().checkpoint.strict);
    harness.blobs.fail_manifest_reads(true);

    let err = harness.controller.run(&input(1)).await.unwrap_err();

    match &err {
        PacerError::CheckpointLoad(reason) => assert!(reason.contains("read timed out")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.api.calls().len(), 3);
    assert_eq!(harness.manifest_bytes().unwrap(), good);
    let record = harness.jobs.record("job-1").unwrap();
    assert_eq!(record.parsed_status(), Some(JobStatus::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_persist_failure_is_fatal_and_marks_job_failed() {
    let harness = Harness::new(3, MockPageApi::new(), PacerConfig::default());
    harness.blobs.fail_manifest_writes(true);

    let err = harness.controller.run(&input(0)).await.unwrap_err();

    match &err {
        PacerError::Persist { key, reason } => {
            assert_eq!(key, "jobs/job-1/segments/manifest.json");
            assert!(reason.contains("bucket unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let record = harness.jobs.record("job-1").unwrap();
    assert_eq!(record.parsed_status(), Some(JobStatus::Failed));
    assert!(record
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("Failed to persist manifest"));
}

#[tokio::test(start_paused = true)]
async fn test_status_update_failure_does_not_fail_invocation() {
    let jobs = Arc::new(ReadOnlyJobStore::default());
    jobs.inner.insert(JobRecord::new("job-1", JobStatus::Processing));
    let blobs = Arc::new(FlakyBlobStore::new());

    let controller = ContinuationController::new(
        PacerConfig::default(),
        blobs,
        jobs,
        Arc::new(StaticItemSource::pages(2)),
        Arc::new(MockPageApi::new()),
    )
    .unwrap();

    let output = tokio_test::assert_ok!(controller.run(&input(0)).await);
    assert_eq!(output.segments_processed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_job_is_not_processed_or_marked_failed() {
    let harness = Harness::new(3, MockPageApi::new(), PacerConfig::default());
    harness
        .jobs
        .insert(JobRecord::new("job-1", JobStatus::Cancelled));

    let err = harness.controller.run(&input(0)).await.unwrap_err();

    assert_eq!(err, PacerError::JobCancelled("job-1".to_string()));
    assert!(harness.api.calls().is_empty());
    assert!(harness.jobs.history().is_empty());
    assert!(harness.manifest_bytes().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_status_is_ignored() {
    let harness = Harness::new(2, MockPageApi::new(), PacerConfig::default());
    let mut record = JobRecord::new("job-1", JobStatus::Pending);
    record.status = "PAUSED_BY_ADMIN".to_string();
    harness.jobs.insert(record);

    let output = harness.controller.run(&input(0)).await.unwrap();
    assert_eq!(output.segments_processed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_offset_beyond_items_is_invalid_input() {
    let harness = Harness::new(3, MockPageApi::new(), PacerConfig::default());

    let err = harness.controller.run(&input(4)).await.unwrap_err();

    assert!(matches!(err, PacerError::InvalidInput(_)));
    assert!(harness.api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_offset_at_end_persists_and_completes() {
    let harness = Harness::new(3, MockPageApi::new(), PacerConfig::default());
    harness.controller.run(&input(0)).await.unwrap();

    let output = harness.controller.run(&input(3)).await.unwrap();

    assert_eq!(output.segments_attempted, 0);
    assert!(!output.continuation_needed);
    assert_eq!(persisted_manifest(&harness).await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_item_fails_after_one_call() {
    let harness = Harness::new(
        3,
        MockPageApi::new().respond(
            1,
            Response::Error(ItemError::Rejected("text too long".to_string())),
        ),
        PacerConfig::default(),
    );

    let output = harness.controller.run(&input(0)).await.unwrap();

    assert_eq!(output.failed_indices, vec![1]);
    assert_eq!(harness.api.calls_for(1).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_job_is_not_found() {
    let blobs = Arc::new(FlakyBlobStore::new());
    let controller = ContinuationController::new(
        PacerConfig::default(),
        blobs,
        Arc::new(InMemoryJobStore::new()),
        Arc::new(StaticItemSource::pages(2)),
        Arc::new(MockPageApi::new()),
    )
    .unwrap();

    let err = controller.run(&input(0)).await.unwrap_err();
    assert_eq!(err, PacerError::JobNotFound("job-1".to_string()));
}
