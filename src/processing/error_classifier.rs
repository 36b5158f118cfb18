//! # Item Error Classification
//!
//! Maps an [`ItemError`] to a category and a retry decision. The processor
//! asks the classifier after every failed attempt; the classifier never looks
//! at the attempt count, which is the retry policy's job.
//!
//! ```text
//! ItemError ──▶ ErrorClassifier ──▶ ErrorClassification { category, is_retryable, error_code }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ItemError;

/// Primary error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Network, bad status or storage hiccup; may succeed on retry
    Transient,
    /// The attempt exceeded its time limit
    Timeout,
    /// Payload arrived but failed its integrity check
    Validation,
    /// Will never succeed if retried
    Permanent,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "transient",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::Permanent => "permanent",
        };
        f.write_str(name)
    }
}

/// Result of classifying one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassification {
    pub category: ErrorCategory,
    pub is_retryable: bool,
    /// Stable code for log aggregation
    pub error_code: &'static str,
}

pub trait ErrorClassifier: Send + Sync + fmt::Debug {
    fn classify(&self, error: &ItemError) -> ErrorClassification;
}

/// Default policy: everything except an explicit rejection is retried
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardErrorClassifier;

impl StandardErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    fn status_code(status: u16) -> &'static str {
        match status {
            429 => "RATE_LIMITED",
            500..=599 => "UPSTREAM_SERVER_ERROR",
            400..=499 => "UPSTREAM_CLIENT_ERROR",
            _ => "UNEXPECTED_STATUS",
        }
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify(&self, error: &ItemError) -> ErrorClassification {
        let (category, is_retryable, error_code) = match error {
            ItemError::Transport(_) => (ErrorCategory::Transient, true, "TRANSPORT"),
            ItemError::BadStatus { status, .. } => {
                (ErrorCategory::Transient, true, Self::status_code(*status))
            }
            ItemError::Storage(_) => (ErrorCategory::Transient, true, "OUTPUT_STORAGE"),
            ItemError::Timeout(_) => (ErrorCategory::Timeout, true, "ATTEMPT_TIMEOUT"),
            ItemError::Validation(_) => (ErrorCategory::Validation, true, "PAYLOAD_INVALID"),
            ItemError::Rejected(_) => (ErrorCategory::Permanent, false, "REJECTED"),
        };

        ErrorClassification {
            category,
            is_retryable,
            error_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bad_status_is_retried_with_specific_code() {
        let classifier = StandardErrorClassifier::new();

        let throttled = classifier.classify(&ItemError::BadStatus {
            status: 429,
            message: "slow down".to_string(),
        });
        assert_eq!(throttled.category, ErrorCategory::Transient);
        assert!(throttled.is_retryable);
        assert_eq!(throttled.error_code, "RATE_LIMITED");

        let not_found = classifier.classify(&ItemError::BadStatus {
            status: 404,
            message: "gone".to_string(),
        });
        assert!(not_found.is_retryable);
        assert_eq!(not_found.error_code, "UPSTREAM_CLIENT_ERROR");
    }

    #[test]
    fn test_validation_and_timeout_are_retryable() {
        let classifier = StandardErrorClassifier::new();
        assert!(
            classifier
                .classify(&ItemError::Validation("html instead of png".to_string()))
                .is_retryable
        );
        let timeout = classifier.classify(&ItemError::Timeout(Duration::from_secs(30)));
        assert_eq!(timeout.category, ErrorCategory::Timeout);
        assert!(timeout.is_retryable);
    }

    #[test]
    fn test_rejection_is_permanent() {
        let classification =
            StandardErrorClassifier::new().classify(&ItemError::Rejected("empty text".to_string()));
        assert_eq!(classification.category, ErrorCategory::Permanent);
        assert!(!classification.is_retryable);
    }
}
