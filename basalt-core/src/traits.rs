//! # Capability Traits
//!
//! The storage engine never touches files or network itself; it reads
//! tables through [`ReadOnlyBlob`] and persists WAL flushes through
//! [`ObjectStore`]. Concrete adapters (local disk, S3, test fakes) live
//! outside this workspace.
//!
//! ## Design Philosophy
//!
//! 1. **Async-First**: all I/O operations are async
//! 2. **Error Propagation**: all operations return `Result`
//! 3. **Testability**: traits enable in-memory fakes in tests

use async_trait::async_trait;
use bytes::Bytes;

use crate::{Range, Result};

/// Random-access read capability over one immutable blob.
///
/// A table reader performs at most four range reads for a point lookup:
/// trailer, info, filter, index, then the candidate block(s).
#[async_trait]
pub trait ReadOnlyBlob: Send + Sync {
    /// Total length of the blob in bytes.
    async fn len(&self) -> Result<u64>;

    /// Read the byte range `[range.start, range.end)`. `range.end` must
    /// not exceed `len()`.
    async fn read_range(&self, range: Range) -> Result<Bytes>;

    /// Read the entire blob.
    async fn read(&self) -> Result<Bytes>;

    /// Stable identifier used in corruption diagnostics.
    fn id(&self) -> String;
}

/// Append-oriented write capability used by the WAL flusher.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write one opaque payload.
    async fn write(&self, data: &[u8]) -> Result<()>;

    /// Read back `size` bytes starting at `offset`.
    async fn read(&self, offset: u64, size: usize) -> Result<Bytes>;

    /// Make previous writes durable.
    async fn sync(&self) -> Result<()>;
}
