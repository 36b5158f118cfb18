#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Pacer Core Rust
//!
//! Resumable, checkpointed processing of large ordered collections of
//! rate-limited work items inside time-budgeted, stateless invocations.
//!
//! ## Overview
//!
//! A serverless function has a hard wall-clock limit; the external API behind
//! each item (page fetch, speech synthesis) needs calls spaced apart. Pacer
//! runs as many items as the remaining budget admits, merges the results into
//! a persisted manifest, and tells the caller whether, and from which offset,
//! to invoke again.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Chunk planning and the per-invocation state machine
//! - [`processing`] - One item: handler seam, validation, retries
//! - [`resilience`] - Rate limiting and backoff
//! - [`storage`] - Blob, job, item-source and checkpoint collaborators
//! - [`models`] - Work items, results, manifests, invocation I/O
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pacer_core::config::PacerConfig;
//! use pacer_core::models::InvocationInput;
//! use pacer_core::orchestration::ContinuationController;
//! use pacer_core::processing::BlobFetchHandler;
//! use pacer_core::storage::{InMemoryBlobStore, InMemoryJobStore, ManifestItemSource};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let blobs = Arc::new(InMemoryBlobStore::new());
//! let controller = ContinuationController::new(
//!     PacerConfig::default(),
//!     blobs.clone(),
//!     Arc::new(InMemoryJobStore::new()),
//!     Arc::new(ManifestItemSource::new(blobs.clone())),
//!     Arc::new(BlobFetchHandler::new(blobs)),
//! )?;
//!
//! let mut input = Some(InvocationInput::new("job-1", "sources/job-1.json"));
//! while let Some(next) = input {
//!     let output = controller.run(&next).await?;
//!     input = output.next_input(&next.source_manifest_key);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod processing;
pub mod resilience;
pub mod storage;

pub use config::{ConfigManager, ConfigurationError, PacerConfig};
pub use constants::JobStatus;
pub use error::{CheckpointError, ItemError, PacerError, PacerResult, StoreError, StoreResult};
pub use models::{
    InvocationInput, InvocationOutput, ProcessedResult, ProcessingManifest, WorkItem,
};
pub use orchestration::ContinuationController;
