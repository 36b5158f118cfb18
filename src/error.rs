//! Error types for the pacer engine.
//!
//! Errors are split by blast radius:
//!
//! - [`ItemError`]: one attempt at one item failed. Recovered locally by the
//!   retrying processor and never surfaced past an invocation.
//! - [`StoreError`]: a collaborator (blob store, job store, item source) failed.
//! - [`CheckpointError`]: loading a persisted manifest failed.
//! - [`PacerError`]: the invocation itself failed and the job should be marked
//!   failed by the caller.

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigurationError;

/// Failure of a single attempt at processing one work item
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unexpected status {status}: {message}")]
    BadStatus { status: u16, message: String },
    #[error("Payload validation failed: {0}")]
    Validation(String),
    #[error("Output storage failed: {0}")]
    Storage(String),
    /// Declared non-retryable by the handler (e.g. input the API will never accept)
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Errors raised by external collaborators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
    #[error("I/O error for '{key}': {reason}")]
    Io { key: String, reason: String },
    #[error("Serialization error for '{key}': {reason}")]
    Serialization { key: String, reason: String },
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn io<K: Into<String>, E: std::fmt::Display>(key: K, error: E) -> Self {
        StoreError::Io {
            key: key.into(),
            reason: error.to_string(),
        }
    }

    pub fn serialization<K: Into<String>, E: std::fmt::Display>(key: K, error: E) -> Self {
        StoreError::Serialization {
            key: key.into(),
            reason: error.to_string(),
        }
    }
}

/// Errors loading a persisted checkpoint manifest
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckpointError {
    #[error("No checkpoint at {key}")]
    Missing { key: String },
    #[error("Checkpoint at {key} is unreadable: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Checkpoint store error: {0}")]
    Store(#[from] StoreError),
}

/// Invocation-level failures. Any of these propagates to the caller, which
/// records it on the job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PacerError {
    #[error("Job not found: {0}")]
    JobNotFound(String),
    #[error("Job {0} was cancelled")]
    JobCancelled(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Item source error: {0}")]
    ItemSource(String),
    #[error("Checkpoint load error: {0}")]
    CheckpointLoad(String),
    #[error("Failed to persist manifest at {key}: {reason}")]
    Persist { key: String, reason: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PacerError {
    /// Whether the caller should record this error on the job record
    pub fn marks_job_failed(&self) -> bool {
        !matches!(self, PacerError::JobCancelled(_))
    }
}

impl From<CheckpointError> for PacerError {
    fn from(error: CheckpointError) -> Self {
        PacerError::CheckpointLoad(error.to_string())
    }
}

impl From<ConfigurationError> for PacerError {
    fn from(error: ConfigurationError) -> Self {
        PacerError::Configuration(error.to_string())
    }
}

pub type PacerResult<T> = std::result::Result<T, PacerError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
