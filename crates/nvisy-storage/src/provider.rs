//! The storage capability contract.

use std::sync::Arc;

use bytes::Bytes;

use crate::Result;
use crate::sequence::ChunkSequence;
use crate::types::{ByteRange, MultipartId, StorageChunk};

/// Type alias for a shared, type-erased storage provider.
pub type BoxedStorageProvider = Arc<dyn StorageProvider>;

/// The primitive operations every storage backend must provide.
///
/// Keys are `/`-separated paths. A key ending in `/` names a directory, but the
/// absence of a trailing separator does not imply an object: callers must ask
/// [`exists`](Self::exists). Whole-buffer transfers, moves and single-buffer
/// multipart chunks are derived from these primitives by
/// [`StorageExt`](crate::StorageExt) and are available on every implementation.
///
/// Implementations must be safe to call concurrently, including concurrent
/// [`upload_chunk_stream`](Self::upload_chunk_stream) calls for the same
/// multipart session. No ordering is imposed across calls; only
/// [`finish`](Self::finish) orders chunks, by their `number`.
#[async_trait::async_trait]
pub trait StorageProvider: Send + Sync {
    /// Returns the currently available capacity in bytes, on a best-effort basis.
    async fn available_space(&self) -> u64;

    /// Persists the whole sequence under `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidKey`] for an unusable key and with
    /// [`InvalidBuffer`] when the sequence yields malformed data. Errors
    /// produced by the sequence itself are returned unchanged.
    ///
    /// [`InvalidKey`]: crate::ErrorKind::InvalidKey
    /// [`InvalidBuffer`]: crate::ErrorKind::InvalidBuffer
    async fn upload_stream(&self, key: &str, sequence: ChunkSequence<Bytes>) -> Result<()>;

    /// Opens a lazy sequence over the object's bytes.
    ///
    /// When `range` is given only the bytes inside the inclusive range are
    /// produced.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidKey`] when no object exists at `key`. How a range
    /// that extends past the object is handled is up to the backend.
    ///
    /// [`InvalidKey`]: crate::ErrorKind::InvalidKey
    async fn download_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ChunkSequence<Bytes>>;

    /// Returns `true` if an object or a directory exists at `key`.
    ///
    /// Directory keys match with and without a trailing separator. Never fails.
    async fn exists(&self, key: &str) -> bool;

    /// Returns the object size in bytes, or `0` for directories and missing keys.
    async fn size(&self, key: &str) -> u64;

    /// Copies the object at `key` to `to`, leaving the source untouched.
    async fn copy(&self, key: &str, to: &str) -> Result<()>;

    /// Lists the names of the immediate children of `key` (the root when `None`).
    ///
    /// Backends should treat a key made only of separators as the root too.
    ///
    /// Listing an object returns an empty list.
    async fn list(&self, key: Option<&str>) -> Result<Vec<String>>;

    /// Removes the object or directory at `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Creates a directory at `key`, including any missing parents.
    async fn create(&self, key: &str) -> Result<()>;

    /// Opens a multipart upload session for `key`.
    async fn create_multipart_id(&self, key: &str) -> Result<MultipartId>;

    /// Persists one chunk of a multipart upload.
    ///
    /// `number` is 1-based and decides where the chunk lands when the upload
    /// is finished; chunks may be uploaded in any order.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidMultipartId`] for an unknown, finished or aborted
    /// session and with [`InvalidMultipartChunk`] for an unusable chunk number.
    ///
    /// [`InvalidMultipartId`]: crate::ErrorKind::InvalidMultipartId
    /// [`InvalidMultipartChunk`]: crate::ErrorKind::InvalidMultipartChunk
    async fn upload_chunk_stream(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        number: u32,
        sequence: ChunkSequence<Bytes>,
    ) -> Result<StorageChunk>;

    /// Discards a multipart session and every chunk uploaded to it.
    async fn abort(&self, multipart_id: &MultipartId, key: &str) -> Result<()>;

    /// Assembles `chunks` in ascending `number` order into the object at `key`
    /// and closes the session.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidMultipartId`] for an unknown, finished or aborted
    /// session and with [`InvalidMultipartChunk`] when the list is empty,
    /// repeats a number, or references a chunk the session does not hold.
    ///
    /// [`InvalidMultipartId`]: crate::ErrorKind::InvalidMultipartId
    /// [`InvalidMultipartChunk`]: crate::ErrorKind::InvalidMultipartChunk
    async fn finish(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        chunks: Vec<StorageChunk>,
    ) -> Result<()>;
}
