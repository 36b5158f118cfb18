use serde::{Deserialize, Serialize};

/// Input of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationInput {
    pub job_id: String,
    pub source_manifest_key: String,
    #[serde(default)]
    pub offset: usize,
}

impl InvocationInput {
    pub fn new(job_id: impl Into<String>, source_manifest_key: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            source_manifest_key: source_manifest_key.into(),
            offset: 0,
        }
    }

    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Output of one invocation, returned to the caller that schedules the next one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOutput {
    pub job_id: String,
    pub result_manifest_key: String,
    /// Results successfully produced by this invocation
    pub segments_processed: usize,
    /// Items this invocation planned and attempted, including skipped ones
    pub segments_attempted: usize,
    /// Indices skipped after exhausting their attempts
    pub failed_indices: Vec<usize>,
    /// Items in the whole job, processed or not
    pub total_segments: usize,
    pub continuation_needed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

impl InvocationOutput {
    /// Input for the follow-up invocation, if one is needed
    pub fn next_input(&self, source_manifest_key: &str) -> Option<InvocationInput> {
        self.next_offset.map(|offset| {
            InvocationInput::new(self.job_id.clone(), source_manifest_key).at_offset(offset)
        })
    }
}
