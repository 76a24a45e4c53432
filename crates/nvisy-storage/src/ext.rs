//! Operations derived from the storage primitives.

use bytes::Bytes;

use crate::provider::StorageProvider;
use crate::sequence::ChunkSequence;
use crate::types::{ByteRange, MultipartId, StorageChunk};
use crate::{Error, Result};

/// Whole-buffer and convenience operations available on every [`StorageProvider`].
///
/// Every method is implemented purely in terms of the provider's primitives,
/// so all backends share the same derived semantics. Errors raised by the
/// primitives are returned unchanged.
#[async_trait::async_trait]
pub trait StorageExt: StorageProvider {
    /// Moves the object at `key` to `to` by copying it and deleting the source.
    ///
    /// The move is not atomic. If the delete fails, or the process stops
    /// between the two steps, both keys hold the object. Concurrent writes to
    /// the source between the copy and the delete are not detected.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidKey`](crate::ErrorKind::InvalidKey) when nothing
    /// exists at `key`.
    async fn move_object(&self, key: &str, to: &str) -> Result<()> {
        if !self.exists(key).await {
            let message = format!("cannot move missing key '{key}'");
            return Err(Error::invalid_key().with_message(message));
        }

        self.copy(key, to).await?;
        self.delete(key).await
    }

    /// Uploads a single buffer under `key`.
    async fn upload(&self, key: &str, buffer: Bytes) -> Result<()> {
        self.upload_stream(key, ChunkSequence::from_buffer(buffer)).await
    }

    /// Downloads the object (or the inclusive `range` of it) into one buffer.
    ///
    /// The whole object is held in memory; use
    /// [`download_stream`](StorageProvider::download_stream) when memory must
    /// stay bounded.
    async fn download(&self, key: &str, range: Option<ByteRange>) -> Result<Bytes> {
        self.download_stream(key, range)
            .await?
            .collect_bytes()
            .await
    }

    /// Uploads a single buffer as chunk `number` of a multipart upload.
    async fn upload_chunk(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        number: u32,
        buffer: Bytes,
    ) -> Result<StorageChunk> {
        self.upload_chunk_stream(
            multipart_id,
            key,
            number,
            ChunkSequence::from_buffer(buffer),
        )
        .await
    }
}

impl<T: StorageProvider + ?Sized> StorageExt for T {}
