//! Evidence-Store: blob storage for uploaded evidence documents
//!
//! Uploaded documents are stored once as opaque bytes and addressed by a
//! content handle. The evaluation engine only ever sees two operations:
//! `store(bytes) -> handle` and `fetch(handle) -> bytes`.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: byte-exact retrieval and deduplication.
//!
//! ## Key Components
//!
//! - `BlobStore`: async storage trait
//! - `BlobHandle`: SHA-256 content handle
//! - `MemoryBlobStore`: in-memory fake for tests
//! - `FsBlobStore`: sharded on-disk store

mod error;
pub mod fakes;
pub mod fs;
pub mod store_traits;

pub use error::StorageError;
pub use fakes::MemoryBlobStore;
pub use fs::FsBlobStore;
pub use store_traits::{BlobHandle, BlobStore, StorageResult};
