//! # Item Processing
//!
//! Everything that happens to a single work item: the external handler seam,
//! payload integrity checks, error classification and the retry loop.

pub mod error_classifier;
pub mod handler;
pub mod item_processor;
pub mod payload_validator;

pub use error_classifier::{
    ErrorCategory, ErrorClassification, ErrorClassifier, StandardErrorClassifier,
};
pub use handler::{BlobFetchHandler, ItemHandler, ItemPayload};
pub use item_processor::{ItemFailure, ItemOutcome, RetryingItemProcessor};
pub use payload_validator::{ContentFamily, ContentKind, PayloadValidator};
