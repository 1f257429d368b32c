use thiserror::Error;

use crate::types::{BlobId, BucketName};

/// Errors surfaced by blob store implementations.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// The requested blob does not exist in the given bucket.
    #[error("Blob {blob_id} not found in bucket {bucket}")]
    NotFound {
        /// Bucket that was searched.
        bucket: BucketName,
        /// Blob id that was requested.
        blob_id: BlobId,
    },

    /// The backing store failed (network, disk, etc.).
    #[error("Blob store backend error: {0}")]
    Backend(String),
}

/// Specialized `Result` type for blob store operations.
pub type Result<T> = std::result::Result<T, BlobStoreError>;
