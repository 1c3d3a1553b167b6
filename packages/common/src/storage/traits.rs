use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::id::BlobId;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Durable binary storage keyed by generated blob id.
///
/// The store holds opaque payloads only; all metadata (owner, filename,
/// content type) lives with whoever holds the returned [`BlobId`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the generated blob id and byte count.
    async fn put(&self, data: &[u8]) -> Result<(BlobId, u64), StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(reader).await
    }

    /// Store data from an async reader without buffering it in full.
    ///
    /// Either the blob is fully committed or it is not visible at all; a
    /// failed or oversized write never leaves a retrievable partial blob.
    async fn put_stream(&self, reader: BoxReader) -> Result<(BlobId, u64), StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, id: &BlobId) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(id).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a lazy, single-pass async reader.
    async fn get_stream(&self, id: &BlobId) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, id: &BlobId) -> Result<bool, StorageError>;

    /// Delete a blob. Idempotent: returns `true` if the blob was deleted,
    /// `false` if it did not exist. Errors only on genuine I/O failure.
    async fn delete(&self, id: &BlobId) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, id: &BlobId) -> Result<u64, StorageError>;
}
