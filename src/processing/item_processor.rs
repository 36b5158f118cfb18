//! # Retrying Item Processor
//!
//! Runs one work item through the external handler with bounded retries:
//!
//! ```text
//! attempt n: handler (timeout) ─▶ validate payload ─▶ put_bytes ─▶ ProcessedResult
//!     │ error
//!     ▼
//! classify ─▶ retryable and attempts left? ─▶ sleep base * 2^n ─▶ attempt n+1
//!     │ no
//!     ▼
//! ItemOutcome::Failed
//! ```
//!
//! Exhausting the attempts is an outcome, not an error: the controller
//! excludes the item and carries on.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{instrument, warn};

use super::error_classifier::{ErrorCategory, ErrorClassifier, StandardErrorClassifier};
use super::handler::ItemHandler;
use super::payload_validator::PayloadValidator;
use crate::config::PacerConfig;
use crate::constants::keys;
use crate::error::ItemError;
use crate::logging::log_item_operation;
use crate::models::{ProcessedResult, WorkItem};
use crate::resilience::{RateLimiter, RetryPolicy};
use crate::storage::BlobStore;

/// An item that could not be processed within its attempts
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub index: usize,
    pub attempts: u32,
    pub last_error: ItemError,
    pub category: ErrorCategory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Processed(ProcessedResult),
    Failed(ItemFailure),
}

impl ItemOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Processed(result) => result.index,
            Self::Failed(failure) => failure.index,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

#[derive(Debug)]
pub struct RetryingItemProcessor {
    job_id: String,
    handler: Arc<dyn ItemHandler>,
    blobs: Arc<dyn BlobStore>,
    key_prefix: String,
    stage: String,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    validator: PayloadValidator,
    classifier: Arc<dyn ErrorClassifier>,
}

impl RetryingItemProcessor {
    pub fn new(
        job_id: impl Into<String>,
        handler: Arc<dyn ItemHandler>,
        blobs: Arc<dyn BlobStore>,
        config: &PacerConfig,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            handler,
            blobs,
            key_prefix: config.checkpoint.key_prefix.clone(),
            stage: config.checkpoint.stage.clone(),
            policy: RetryPolicy::from_config(&config.retry),
            attempt_timeout: config.retry.attempt_timeout(),
            validator: PayloadValidator::from_config(&config.validation),
            classifier: Arc::new(StandardErrorClassifier::new()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Process one item with retries.
    ///
    /// The caller admits the first attempt through `limiter`; retries go
    /// through it again after their backoff so every external call respects
    /// the minimum spacing.
    #[instrument(skip(self, item, limiter), fields(job_id = %self.job_id, index = item.index))]
    pub async fn process_one(&self, item: &WorkItem, limiter: &mut RateLimiter) -> ItemOutcome {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                limiter.wait().await;
            }

            let error = match self.attempt(item).await {
                Ok(result) => return self.accept(item, result, attempt + 1),
                Err(error) => error,
            };

            let classification = self.classifier.classify(&error);
            if classification.is_retryable && self.policy.should_retry(attempt) {
                let delay = self.policy.delay_for(attempt);
                warn!(
                    job_id = %self.job_id,
                    index = item.index,
                    attempt = attempt + 1,
                    error_code = classification.error_code,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Item attempt failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
                continue;
            }

            let details = format!("{}: {error}", classification.error_code);
            log_item_operation(
                "process",
                &self.job_id,
                item.index,
                Some(attempt + 1),
                "failed",
                Some(&details),
            );
            return ItemOutcome::Failed(ItemFailure {
                index: item.index,
                attempts: attempt + 1,
                last_error: error,
                category: classification.category,
            });
        }
    }

    async fn attempt(&self, item: &WorkItem) -> Result<ProcessedResult, ItemError> {
        let payload = timeout(self.attempt_timeout, self.handler.handle(&self.job_id, item))
            .await
            .map_err(|_| ItemError::Timeout(self.attempt_timeout))??;

        let kind = self.validator.validate_payload(&payload)?;
        let metric = payload.metric.unwrap_or(payload.data.len() as f64);
        let output_key = keys::item_output_key(
            &self.key_prefix,
            &self.job_id,
            &self.stage,
            item.index,
            kind.extension(),
        );

        self.blobs
            .put_bytes(payload.data, &output_key, kind.mime_type())
            .await
            .map_err(|e| ItemError::Storage(e.to_string()))?;

        Ok(ProcessedResult::for_item(item, output_key, metric))
    }

    fn accept(&self, item: &WorkItem, result: ProcessedResult, attempts: u32) -> ItemOutcome {
        if let Err(reason) = self.validator.validate_result(item, &result) {
            log_item_operation(
                "process",
                &self.job_id,
                item.index,
                Some(attempts),
                "rejected",
                Some(&reason),
            );
            return ItemOutcome::Failed(ItemFailure {
                index: item.index,
                attempts,
                last_error: ItemError::Validation(reason),
                category: ErrorCategory::Validation,
            });
        }

        log_item_operation(
            "process",
            &self.job_id,
            item.index,
            Some(attempts),
            "success",
            None,
        );
        ItemOutcome::Processed(result)
    }
}
