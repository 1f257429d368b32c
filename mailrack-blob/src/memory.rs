use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    BlobStoreError, Result,
    store::BlobStore,
    types::{BlobId, BucketName},
};

/// In-memory blob store.
///
/// Primarily a test double, but usable for transient deployments. Blobs
/// live in a concurrent map keyed by `(bucket, blob id)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<(BucketName, BlobId), Arc<[u8]>>>,
}

impl MemoryBlobStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, bucket: &BucketName, bytes: &[u8]) -> Result<BlobId> {
        let blob_id = BlobId::generate();
        self.blobs
            .insert((bucket.clone(), blob_id.clone()), Arc::from(bytes));
        Ok(blob_id)
    }

    async fn read(&self, bucket: &BucketName, blob_id: &BlobId) -> Result<Arc<[u8]>> {
        self.blobs
            .get(&(bucket.clone(), blob_id.clone()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlobStoreError::NotFound {
                bucket: bucket.clone(),
                blob_id: blob_id.clone(),
            })
    }

    async fn delete(&self, bucket: &BucketName, blob_id: &BlobId) -> Result<()> {
        self.blobs.remove(&(bucket.clone(), blob_id.clone()));
        Ok(())
    }
}
