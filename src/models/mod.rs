//! # Data Model
//!
//! Work items flowing in, results flowing out, and the persisted manifest that
//! carries accumulated results across invocations.

pub mod chunk_plan;
pub mod invocation;
pub mod job_record;
pub mod manifest;
pub mod processed_result;
pub mod work_item;

pub use chunk_plan::ChunkPlan;
pub use invocation::{InvocationInput, InvocationOutput};
pub use job_record::{resumable_jobs, JobRecord, StatusUpdate};
pub use manifest::{MergeSummary, ProcessingManifest};
pub use processed_result::ProcessedResult;
pub use work_item::{ItemSourceRef, Metadata, WorkItem};
