//! Blob store boundary.
//!
//! Queued messages are split into header and body blobs held by an
//! external blob store; the queue index stores only [`BlobId`]s. This
//! crate defines that boundary as a trait plus an in-memory
//! implementation used throughout the test suites.

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{BlobStoreError, Result};
pub use memory::MemoryBlobStore;
pub use store::BlobStore;
pub use types::{BlobId, BucketName};
