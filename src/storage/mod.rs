//! # Storage Collaborators
//!
//! Narrow interfaces to the systems this engine does not own, plus the
//! implementations the engine ships with:
//!
//! - [`BlobStore`]: JSON documents and binary objects by key.
//!   [`InMemoryBlobStore`] and [`FsBlobStore`].
//! - [`JobStore`]: job records and status updates. [`InMemoryJobStore`] and
//!   [`BlobJobStore`] (records stored as JSON in a blob store).
//! - [`ItemSource`]: the ordered work items of a job. [`ManifestItemSource`]
//!   reads them from a source manifest in a blob store.
//! - [`CheckpointStore`]: manifest load/save on top of a blob store.

pub mod blob_store;
pub mod checkpoint;
pub mod fs_blob_store;
pub mod item_source;
pub mod job_store;

pub use blob_store::{BlobStore, InMemoryBlobStore, StoredObject};
pub use checkpoint::CheckpointStore;
pub use fs_blob_store::FsBlobStore;
pub use item_source::{ItemSource, ManifestItemSource};
pub use job_store::{BlobJobStore, InMemoryJobStore, JobStore};
