//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryBlobStore` satisfies the `BlobStore` contract without touching disk.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::store_traits::*;

/// In-memory blob store backed by a `HashMap<handle, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "memory blob store lock poisoned",
    ))
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, data: &[u8]) -> StorageResult<BlobHandle> {
        let handle = BlobHandle::for_bytes(data);
        let mut blobs = self.blobs.lock().map_err(|_| poisoned())?;
        blobs
            .entry(handle.as_str().to_string())
            .or_insert_with(|| data.to_vec());
        Ok(handle)
    }

    async fn fetch(&self, handle: &BlobHandle) -> StorageResult<Vec<u8>> {
        let blobs = self.blobs.lock().map_err(|_| poisoned())?;
        blobs
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                handle: handle.as_str().to_string(),
            })
    }

    async fn contains(&self, handle: &BlobHandle) -> StorageResult<bool> {
        let blobs = self.blobs.lock().map_err(|_| poisoned())?;
        Ok(blobs.contains_key(handle.as_str()))
    }

    async fn delete(&self, handle: &BlobHandle) -> StorageResult<()> {
        let mut blobs = self.blobs.lock().map_err(|_| poisoned())?;
        blobs.remove(handle.as_str());
        Ok(())
    }
}
