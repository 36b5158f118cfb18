//! # Continuation Controller
//!
//! Drives one invocation of a job through its states:
//!
//! ```text
//! Start ─▶ LoadCheckpoint ─▶ Plan ─▶ Process ─▶ Merge ─▶ Persist ─▶ Decide ─┬─▶ Continue ─▶ End
//!                                                                          └─▶ Complete ─▶ End
//! ```
//!
//! Nothing survives between invocations except the persisted manifest and the
//! offset the caller passes back in. Item failures are absorbed here; anything
//! that threatens the manifest propagates.

use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::chunk_planner;
use crate::config::PacerConfig;
use crate::constants::{progress, JobStatus};
use crate::error::{CheckpointError, PacerError, PacerResult};
use crate::logging::log_invocation_operation;
use crate::models::{
    ChunkPlan, InvocationInput, InvocationOutput, ProcessedResult, ProcessingManifest,
    StatusUpdate, WorkItem,
};
use crate::processing::{
    ErrorClassifier, ItemHandler, ItemOutcome, RetryingItemProcessor, StandardErrorClassifier,
};
use crate::resilience::RateLimiter;
use crate::storage::{BlobStore, CheckpointStore, ItemSource, JobStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Start,
    LoadCheckpoint,
    Plan,
    Process,
    Merge,
    Persist,
    Decide,
    Continue,
    Complete,
    End,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::LoadCheckpoint => "load_checkpoint",
            Self::Plan => "plan",
            Self::Process => "process",
            Self::Merge => "merge",
            Self::Persist => "persist",
            Self::Decide => "decide",
            Self::Continue => "continue",
            Self::Complete => "complete",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

fn enter(job_id: &str, state: InvocationState) {
    debug!(job_id = %job_id, state = %state, "Invocation state transition");
}

/// What the Process state produced
#[derive(Debug, Default)]
struct ChunkResults {
    processed: Vec<ProcessedResult>,
    failed_indices: Vec<usize>,
}

#[derive(Debug)]
pub struct ContinuationController {
    config: PacerConfig,
    blobs: Arc<dyn BlobStore>,
    checkpoints: CheckpointStore,
    jobs: Arc<dyn JobStore>,
    items: Arc<dyn ItemSource>,
    handler: Arc<dyn ItemHandler>,
    classifier: Arc<dyn ErrorClassifier>,
}

impl ContinuationController {
    /// Build a controller, rejecting a configuration it cannot run with
    pub fn new(
        config: PacerConfig,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobStore>,
        items: Arc<dyn ItemSource>,
        handler: Arc<dyn ItemHandler>,
    ) -> PacerResult<Self> {
        config.validate()?;

        Ok(Self {
            checkpoints: CheckpointStore::new(blobs.clone(), &config.checkpoint),
            config,
            blobs,
            jobs,
            items,
            handler,
            classifier: Arc::new(StandardErrorClassifier::new()),
        })
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Run one invocation and record a fatal failure on the job.
    ///
    /// Cancellation is returned as an error but leaves the job record alone.
    pub async fn run(&self, input: &InvocationInput) -> PacerResult<InvocationOutput> {
        match self.execute(input).await {
            Ok(output) => Ok(output),
            Err(error) => {
                log_invocation_operation(
                    "invoke",
                    &input.job_id,
                    input.offset,
                    "failed",
                    Some(&error.to_string()),
                );
                if error.marks_job_failed() {
                    self.report_status(&input.job_id, StatusUpdate::failed(error.to_string()))
                        .await;
                }
                Err(error)
            }
        }
    }

    /// Run one invocation without touching the job record on failure
    #[instrument(skip(self, input), fields(job_id = %input.job_id, offset = input.offset))]
    pub async fn execute(&self, input: &InvocationInput) -> PacerResult<InvocationOutput> {
        let started = Instant::now();
        let job_id = input.job_id.as_str();

        enter(job_id, InvocationState::Start);
        let items = self.start(input).await?;
        let total_items = items.len();

        enter(job_id, InvocationState::LoadCheckpoint);
        let mut manifest = if input.offset == 0 {
            ProcessingManifest::new(job_id)
        } else {
            self.load_checkpoint(job_id).await?
        };

        enter(job_id, InvocationState::Plan);
        let remaining_budget = self
            .config
            .chunking
            .effective_budget()
            .saturating_sub(started.elapsed());
        let chunk = chunk_planner::plan_chunk(
            total_items,
            input.offset,
            remaining_budget,
            self.config.chunking.per_item_estimate(),
        );
        log_invocation_operation(
            "plan",
            job_id,
            input.offset,
            "planned",
            Some(&format!(
                "{} of {} items, estimated {:?} of {:?} remaining",
                chunk.item_count,
                total_items.saturating_sub(input.offset),
                chunk.estimated_duration,
                remaining_budget
            )),
        );

        enter(job_id, InvocationState::Process);
        let results = self.process_chunk(job_id, &items, &chunk).await;
        let segments_processed = results.processed.len();

        enter(job_id, InvocationState::Merge);
        let summary = manifest.merge(results.processed);
        debug!(
            job_id = %job_id,
            appended = summary.appended,
            replaced = summary.replaced,
            total_metric = manifest.total_metric(),
            "Merged chunk into manifest"
        );

        enter(job_id, InvocationState::Persist);
        let result_manifest_key = self
            .checkpoints
            .save(&manifest)
            .await
            .map_err(|e| PacerError::Persist {
                key: self.checkpoints.manifest_key(job_id),
                reason: e.to_string(),
            })?;

        enter(job_id, InvocationState::Decide);
        let next_offset = chunk.end_offset();
        let continuation_needed = next_offset < total_items;

        let update = if continuation_needed {
            enter(job_id, InvocationState::Continue);
            StatusUpdate::in_progress(self.progress_pct(next_offset, total_items))
        } else {
            enter(job_id, InvocationState::Complete);
            StatusUpdate::stage_complete(self.config.progress.stage_end_pct)
        };
        self.report_status(job_id, update).await;

        let output = InvocationOutput {
            job_id: job_id.to_string(),
            result_manifest_key,
            segments_processed,
            segments_attempted: chunk.item_count,
            failed_indices: results.failed_indices,
            total_segments: total_items,
            continuation_needed,
            next_offset: continuation_needed.then_some(next_offset),
        };

        enter(job_id, InvocationState::End);
        info!(
            job_id = %job_id,
            offset = input.offset,
            segments_processed = output.segments_processed,
            segments_attempted = output.segments_attempted,
            failed = output.failed_indices.len(),
            total_segments = output.total_segments,
            manifest_segments = manifest.len(),
            continuation_needed = output.continuation_needed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Invocation finished"
        );
        Ok(output)
    }

    /// Check the job is runnable and load its ordered items
    async fn start(&self, input: &InvocationInput) -> PacerResult<Vec<WorkItem>> {
        let job_id = input.job_id.as_str();

        let record = self
            .jobs
            .get_job(job_id)
            .await
            .map_err(|e| PacerError::Internal(format!("job lookup failed: {e}")))?
            .ok_or_else(|| PacerError::JobNotFound(job_id.to_string()))?;

        if record.parsed_status() == Some(JobStatus::Cancelled) {
            info!(job_id = %job_id, "Job is cancelled, not processing");
            return Err(PacerError::JobCancelled(job_id.to_string()));
        }

        let items = self
            .items
            .load_items(job_id, &input.source_manifest_key)
            .await
            .map_err(|e| PacerError::ItemSource(e.to_string()))?;

        if let Some((position, item)) = items
            .iter()
            .enumerate()
            .find(|(position, item)| item.index != *position)
        {
            return Err(PacerError::ItemSource(format!(
                "item at position {position} carries index {}",
                item.index
            )));
        }

        if input.offset > items.len() {
            return Err(PacerError::InvalidInput(format!(
                "offset {} is beyond the {} items of job {job_id}",
                input.offset,
                items.len()
            )));
        }

        Ok(items)
    }

    async fn load_checkpoint(&self, job_id: &str) -> PacerResult<ProcessingManifest> {
        match self.checkpoints.load(job_id).await {
            Ok(manifest) => Ok(manifest),
            Err(CheckpointError::Missing { key }) => {
                warn!(
                    job_id = %job_id,
                    key = %key,
                    "No checkpoint on a continuation, starting from an empty manifest"
                );
                Ok(ProcessingManifest::new(job_id))
            }
            Err(CheckpointError::Corrupt { key, reason }) if !self.config.checkpoint.strict => {
                warn!(
                    job_id = %job_id,
                    key = %key,
                    reason = %reason,
                    "Unreadable checkpoint, starting from an empty manifest"
                );
                Ok(ProcessingManifest::new(job_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn process_chunk(
        &self,
        job_id: &str,
        items: &[WorkItem],
        chunk: &ChunkPlan,
    ) -> ChunkResults {
        let processor = RetryingItemProcessor::new(
            job_id,
            self.handler.clone(),
            self.blobs.clone(),
            &self.config,
        )
        .with_classifier(self.classifier.clone());
        let mut limiter = RateLimiter::from_config(self.handler.name(), &self.config.rate_limit);
        let mut results = ChunkResults {
            processed: Vec::with_capacity(chunk.item_count),
            failed_indices: Vec::new(),
        };

        for item in &items[chunk.range()] {
            limiter.wait().await;
            match processor.process_one(item, &mut limiter).await {
                ItemOutcome::Processed(result) => results.processed.push(result),
                ItemOutcome::Failed(failure) => {
                    warn!(
                        job_id = %job_id,
                        index = failure.index,
                        attempts = failure.attempts,
                        category = %failure.category,
                        error = %failure.last_error,
                        "Skipping item after exhausting attempts"
                    );
                    results.failed_indices.push(failure.index);
                }
            }
        }

        results
    }

    /// Progress through this stage mapped into the configured percentage band
    fn progress_pct(&self, done: usize, total: usize) -> u8 {
        let start = u64::from(self.config.progress.stage_start_pct);
        let end = u64::from(self.config.progress.stage_end_pct);
        if total == 0 {
            return self.config.progress.stage_end_pct;
        }

        let span = end.saturating_sub(start);
        let pct = start + span * done.min(total) as u64 / total as u64;
        u8::try_from(pct.min(u64::from(progress::MAX_PCT))).unwrap_or(progress::MAX_PCT)
    }

    async fn report_status(&self, job_id: &str, update: StatusUpdate) {
        let status = update.status;
        if let Err(e) = self.jobs.update_status(job_id, update).await {
            warn!(
                job_id = %job_id,
                status = %status,
                error = %e,
                "Best-effort job status update failed"
            );
        }
    }
}
