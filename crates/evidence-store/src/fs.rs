use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::store_traits::{BlobHandle, BlobStore, StorageResult};

/// Filesystem-backed blob store with git-style 2-char sharding.
///
/// Layout: `<root>/objects/<first 2 hex chars>/<remaining hex chars>`
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    objects_dir: PathBuf,
}

impl FsBlobStore {
    /// Create a new `FsBlobStore` rooted at `root`. Creates `root/objects/` if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let objects_dir = root.as_ref().join("objects");
        std::fs::create_dir_all(&objects_dir)?;
        Ok(Self { objects_dir })
    }

    fn blob_path(&self, handle: &BlobHandle) -> PathBuf {
        let hex = handle.as_str();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }
}

fn write_blob(shard_dir: &Path, path: &Path, data: &[u8]) -> StorageResult<()> {
    std::fs::create_dir_all(shard_dir)?;

    // Write to a temp file in the shard, then rename into place.
    let mut tmp = NamedTempFile::new_in(shard_dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, data: &[u8]) -> StorageResult<BlobHandle> {
        let handle = BlobHandle::for_bytes(data);
        let path = self.blob_path(&handle);

        if tokio::fs::try_exists(&path).await? {
            debug!(handle = %handle.short(), "blob already stored");
            return Ok(handle);
        }

        let shard_dir = self.objects_dir.join(&handle.as_str()[..2]);
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || write_blob(&shard_dir, &path, &data))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        debug!(handle = %handle.short(), "blob stored");
        Ok(handle)
    }

    async fn fetch(&self, handle: &BlobHandle) -> StorageResult<Vec<u8>> {
        let path = self.blob_path(handle);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    handle: handle.as_str().to_string(),
                }
            } else {
                StorageError::Io(e)
            }
        })
    }

    async fn contains(&self, handle: &BlobHandle) -> StorageResult<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(handle)).await?)
    }

    async fn delete(&self, handle: &BlobHandle) -> StorageResult<()> {
        match tokio::fs::remove_file(self.blob_path(handle)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
