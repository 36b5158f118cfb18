use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::JobStatus;

/// Job record as held by the external job store.
///
/// `status` stays a free-form string because other pipeline stages write it
/// too; use [`JobRecord::parsed_status`] to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_pct: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status: status.to_string(),
            progress_pct: None,
            error_message: None,
            updated_at: Utc::now(),
        }
    }

    /// Parsed status; unknown strings are logged and yield `None`
    pub fn parsed_status(&self) -> Option<JobStatus> {
        JobStatus::parse_persisted(&self.job_id, &self.status)
    }

    pub fn apply(&mut self, update: &StatusUpdate) {
        self.status = update.status.to_string();
        if update.progress_pct.is_some() {
            self.progress_pct = update.progress_pct;
        }
        self.error_message = update.error_message.clone();
        self.updated_at = Utc::now();
    }
}

/// A status change requested of the job store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub progress_pct: Option<u8>,
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn in_progress(progress_pct: u8) -> Self {
        Self {
            status: JobStatus::Processing,
            progress_pct: Some(progress_pct),
            error_message: None,
        }
    }

    pub fn stage_complete(progress_pct: u8) -> Self {
        Self {
            status: JobStatus::StageComplete,
            progress_pct: Some(progress_pct),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress_pct: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Filter records down to those that can still be resumed.
///
/// Records with unparseable statuses are logged and excluded rather than
/// failing the whole batch.
pub fn resumable_jobs(records: &[JobRecord]) -> Vec<&JobRecord> {
    records
        .iter()
        .filter(|record| {
            matches!(
                record.parsed_status(),
                Some(JobStatus::Pending | JobStatus::Processing | JobStatus::Failed)
            )
        })
        .collect()
}
