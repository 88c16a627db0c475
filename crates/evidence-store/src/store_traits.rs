//! Storage trait definitions for evidence documents
//!
//! `BlobStore` is the only storage abstraction the engine depends on. It is
//! async and backend-agnostic; an in-memory fake lives in the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Content handle of a stored blob (SHA-256 hex string).
///
/// The inner field is private so a handle is always lowercase hex produced by
/// `for_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobHandle(String);

impl BlobHandle {
    /// Compute the handle the given bytes will be stored under.
    pub fn for_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        BlobHandle(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for BlobHandle {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidHandle { handle: s });
        }
        Ok(BlobHandle(s.to_ascii_lowercase()))
    }
}

impl From<BlobHandle> for String {
    fn from(handle: BlobHandle) -> Self {
        handle.0
    }
}

impl std::str::FromStr for BlobHandle {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        BlobHandle::try_from(s.to_string())
    }
}

impl std::fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blob store for evidence documents.
///
/// Guarantees:
/// - `store(data)` always returns `BlobHandle::for_bytes(data)`.
/// - `fetch(handle)` returns the exact bytes previously stored.
/// - Storing the same content twice is a no-op (deduplication).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their handle.
    async fn store(&self, data: &[u8]) -> StorageResult<BlobHandle>;

    /// Retrieve bytes by handle. Returns `StorageError::NotFound` if absent.
    async fn fetch(&self, handle: &BlobHandle) -> StorageResult<Vec<u8>>;

    /// Check whether a handle exists in the store.
    async fn contains(&self, handle: &BlobHandle) -> StorageResult<bool>;

    /// Delete a blob. No-op if absent.
    async fn delete(&self, handle: &BlobHandle) -> StorageResult<()>;
}
