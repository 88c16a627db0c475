//! Error types for evidence-store

use thiserror::Error;

/// Errors that can occur in the blob storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// No blob stored under this handle
    #[error("blob not found: {handle}")]
    NotFound { handle: String },

    /// Handle is not a 64-char SHA-256 hex string
    #[error("invalid blob handle: {handle}")]
    InvalidHandle { handle: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
