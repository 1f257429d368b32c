use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Result,
    types::{BlobId, BucketName},
};

/// Capability to store and retrieve opaque byte blobs.
///
/// The queue index never holds message bytes itself, only blob ids; the
/// store behind this trait owns the bytes. Implementations are expected
/// to be safe for concurrent use from many producers and consumers.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Store `bytes` and return the id under which they were saved.
    ///
    /// # Errors
    /// If the backend rejects the write.
    async fn save(&self, bucket: &BucketName, bytes: &[u8]) -> Result<BlobId>;

    /// Fetch the bytes previously saved under `blob_id`.
    ///
    /// # Errors
    /// [`crate::BlobStoreError::NotFound`] if the blob does not exist,
    /// or a backend error.
    async fn read(&self, bucket: &BucketName, blob_id: &BlobId) -> Result<Arc<[u8]>>;

    /// Remove the blob. Removing a missing blob is a no-op.
    ///
    /// # Errors
    /// If the backend rejects the delete.
    async fn delete(&self, bucket: &BucketName, blob_id: &BlobId) -> Result<()>;
}
