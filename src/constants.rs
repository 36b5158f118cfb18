//! # System Constants
//!
//! Job status vocabulary and storage key layout shared by the controller and
//! the collaborator implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Job status as persisted on the job record.
///
/// The job store holds a free-form string; it is parsed into this closed set
/// with [`JobStatus::parse_persisted`] and anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, no invocation has run yet
    Pending,
    /// An invocation has made progress and more work remains
    Processing,
    /// This processing stage has finished; downstream stages take over
    StageComplete,
    /// The whole job has finished
    Completed,
    /// An invocation failed fatally
    Failed,
    /// The job was cancelled by an operator
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::StageComplete => "stage_complete",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a persisted status string, logging and rejecting unknown values
    pub fn parse_persisted(job_id: &str, raw: &str) -> Option<Self> {
        match raw.parse::<Self>() {
            Ok(status) => Some(status),
            Err(reason) => {
                tracing::warn!(
                    job_id = %job_id,
                    raw_status = %raw,
                    %reason,
                    "Ignoring unparseable job status"
                );
                None
            }
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "stage_complete" => Ok(Self::StageComplete),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

/// Storage key layout
pub mod keys {
    /// File name of the per-stage manifest
    pub const MANIFEST_FILE: &str = "manifest.json";

    /// File name of a job record stored in a blob store
    pub const JOB_RECORD_FILE: &str = "job.json";

    /// Width of the zero-padded index in item output keys
    pub const INDEX_WIDTH: usize = 5;

    pub fn manifest_key(prefix: &str, job_id: &str, stage: &str) -> String {
        format!("{prefix}/{job_id}/{stage}/{MANIFEST_FILE}")
    }

    pub fn item_output_key(
        prefix: &str,
        job_id: &str,
        stage: &str,
        index: usize,
        extension: &str,
    ) -> String {
        format!(
            "{prefix}/{job_id}/{stage}/{index:0width$}.{extension}",
            width = INDEX_WIDTH
        )
    }

    pub fn job_record_key(prefix: &str, job_id: &str) -> String {
        format!("{prefix}/{job_id}/{JOB_RECORD_FILE}")
    }
}

pub mod progress {
    pub const MAX_PCT: u8 = 100;
}
