//! Shared storage handle with structured logging.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::TRACING_TARGET_SERVICE;
use crate::provider::{BoxedStorageProvider, StorageProvider};
use crate::sequence::ChunkSequence;
use crate::types::{ByteRange, MultipartId, StorageChunk};
use crate::Result;

/// A cheaply clonable handle to a storage provider.
///
/// The service implements [`StorageProvider`] itself by delegating to the
/// wrapped provider and records a tracing event for every call and its
/// outcome. It adds no retries and no timeouts; callers that need a bounded
/// wait wrap the returned futures themselves.
///
/// # Example
///
/// ```rust,ignore
/// use nvisy_storage::{StorageExt, StorageService};
///
/// let storage = StorageService::new(provider).with_service_name("avatars");
/// storage.upload("user/42.png", bytes).await?;
/// ```
#[derive(Clone)]
pub struct StorageService {
    inner: BoxedStorageProvider,
    service_name: Arc<str>,
}

impl StorageService {
    /// Wraps a provider using the default service name `"storage"`.
    pub fn new(provider: impl StorageProvider + 'static) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    /// Wraps an already shared provider.
    pub fn from_shared(provider: BoxedStorageProvider) -> Self {
        Self {
            inner: provider,
            service_name: Arc::from("storage"),
        }
    }

    /// Sets the service name attached to every log event.
    pub fn with_service_name(mut self, name: impl AsRef<str>) -> Self {
        self.service_name = Arc::from(name.as_ref());
        self
    }

    /// Returns the service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the wrapped provider.
    pub fn provider(&self) -> &BoxedStorageProvider {
        &self.inner
    }

    fn observe<T>(&self, operation: &'static str, key: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => tracing::debug!(
                target: TRACING_TARGET_SERVICE,
                service = %self.service_name,
                operation,
                key,
                "Storage operation completed"
            ),
            Err(error) => tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                service = %self.service_name,
                operation,
                key,
                kind = error.kind_str(),
                error = %error,
                "Storage operation failed"
            ),
        }

        result
    }
}

#[async_trait::async_trait]
impl StorageProvider for StorageService {
    async fn available_space(&self) -> u64 {
        self.inner.available_space().await
    }

    async fn upload_stream(&self, key: &str, sequence: ChunkSequence<Bytes>) -> Result<()> {
        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            service = %self.service_name,
            key,
            length = ?sequence.length(),
            "Uploading object"
        );

        let result = self.inner.upload_stream(key, sequence).await;
        self.observe("upload_stream", key, result)
    }

    async fn download_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ChunkSequence<Bytes>> {
        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            service = %self.service_name,
            key,
            range = ?range,
            "Downloading object"
        );

        let result = self.inner.download_stream(key, range).await;
        self.observe("download_stream", key, result)
    }

    async fn exists(&self, key: &str) -> bool {
        let exists = self.inner.exists(key).await;
        tracing::trace!(
            target: TRACING_TARGET_SERVICE,
            service = %self.service_name,
            key,
            exists,
            "Checked key existence"
        );
        exists
    }

    async fn size(&self, key: &str) -> u64 {
        self.inner.size(key).await
    }

    async fn copy(&self, key: &str, to: &str) -> Result<()> {
        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            service = %self.service_name,
            from = key,
            to,
            "Copying object"
        );

        let result = self.inner.copy(key, to).await;
        self.observe("copy", key, result)
    }

    async fn list(&self, key: Option<&str>) -> Result<Vec<String>> {
        let result = self.inner.list(key).await;
        self.observe("list", key.unwrap_or_default(), result)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            service = %self.service_name,
            key,
            "Deleting key"
        );

        let result = self.inner.delete(key).await;
        self.observe("delete", key, result)
    }

    async fn create(&self, key: &str) -> Result<()> {
        let result = self.inner.create(key).await;
        self.observe("create", key, result)
    }

    async fn create_multipart_id(&self, key: &str) -> Result<MultipartId> {
        let result = self.inner.create_multipart_id(key).await;
        if let Ok(multipart_id) = &result {
            tracing::info!(
                target: TRACING_TARGET_SERVICE,
                service = %self.service_name,
                key,
                multipart_id = %multipart_id,
                "Multipart upload started"
            );
        }

        self.observe("create_multipart_id", key, result)
    }

    async fn upload_chunk_stream(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        number: u32,
        sequence: ChunkSequence<Bytes>,
    ) -> Result<StorageChunk> {
        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            service = %self.service_name,
            key,
            multipart_id = %multipart_id,
            number,
            length = ?sequence.length(),
            "Uploading multipart chunk"
        );

        let result = self
            .inner
            .upload_chunk_stream(multipart_id, key, number, sequence)
            .await;
        self.observe("upload_chunk_stream", key, result)
    }

    async fn abort(&self, multipart_id: &MultipartId, key: &str) -> Result<()> {
        let result = self.inner.abort(multipart_id, key).await;
        if result.is_ok() {
            tracing::info!(
                target: TRACING_TARGET_SERVICE,
                service = %self.service_name,
                key,
                multipart_id = %multipart_id,
                "Multipart upload aborted"
            );
        }

        self.observe("abort", key, result)
    }

    async fn finish(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        chunks: Vec<StorageChunk>,
    ) -> Result<()> {
        let count = chunks.len();
        let result = self.inner.finish(multipart_id, key, chunks).await;
        if result.is_ok() {
            tracing::info!(
                target: TRACING_TARGET_SERVICE,
                service = %self.service_name,
                key,
                multipart_id = %multipart_id,
                chunks = count,
                "Multipart upload finished"
            );
        }

        self.observe("finish", key, result)
    }
}

impl fmt::Debug for StorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageService")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}
