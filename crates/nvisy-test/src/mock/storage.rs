//! In-memory storage provider.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
#[cfg(feature = "config")]
use clap::Args;
use futures::stream;
use nvisy_storage::{
    ByteRange, ChunkSequence, Error, MultipartId, Result, StorageChunk, StorageProvider,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::key;
use crate::TRACING_TARGET_MOCK;

/// Configuration for the mock storage provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct MockStorageConfig {
    /// Total capacity in bytes reported by `available_space`.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "mock-storage-capacity",
            env = "MOCK_STORAGE_CAPACITY",
            default_value = "1073741824"
        )
    )]
    #[serde(default = "default_capacity")]
    pub capacity: u64,

    /// Size of the buffers produced by `download_stream`.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "mock-storage-chunk-size",
            env = "MOCK_STORAGE_CHUNK_SIZE",
            default_value = "65536"
        )
    )]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_capacity() -> u64 {
    1024 * 1024 * 1024
}

fn default_chunk_size() -> usize {
    64 * 1024
}

impl Default for MockStorageConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// One uploaded multipart chunk.
#[derive(Debug)]
struct StoredChunk {
    chunk_id: String,
    data: Bytes,
}

/// An open multipart session.
#[derive(Debug)]
struct MultipartSession {
    key: String,
    chunks: HashMap<u32, StoredChunk>,
}

#[derive(Debug, Default)]
struct MockState {
    objects: BTreeMap<String, Bytes>,
    directories: BTreeSet<String>,
    sessions: HashMap<MultipartId, MultipartSession>,
}

impl MockState {
    fn used_bytes(&self) -> u64 {
        let objects: usize = self.objects.values().map(Bytes::len).sum();
        let pending: usize = self
            .sessions
            .values()
            .flat_map(|session| session.chunks.values())
            .map(|chunk| chunk.data.len())
            .sum();
        (objects + pending) as u64
    }

    fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key) || self.directories.contains(key)
    }

    /// Creates the directories above `key`, failing if one of them is an object.
    fn create_ancestors(&mut self, key: &str) -> Result<()> {
        if let Some(blocking) = key::ancestors(key).find(|dir| self.objects.contains_key(*dir)) {
            return Err(Error::invalid_key()
                .with_message(format!("'{blocking}' is an object, not a directory")));
        }

        for dir in key::ancestors(key) {
            self.directories.insert(dir.to_owned());
        }
        Ok(())
    }

    fn put_object(&mut self, key: &str, data: Bytes) -> Result<()> {
        if self.directories.contains(key) {
            return Err(Error::invalid_key().with_message(format!("'{key}' is a directory")));
        }

        self.create_ancestors(key)?;
        self.objects.insert(key.to_owned(), data);
        Ok(())
    }

    fn session(&self, multipart_id: &MultipartId, key: &str) -> Result<&MultipartSession> {
        self.sessions
            .get(multipart_id)
            .filter(|session| session.key == key)
            .ok_or_else(|| unknown_session(multipart_id))
    }
}

fn unknown_session(multipart_id: &MultipartId) -> Error {
    Error::invalid_multipart_id().with_message(format!("no open multipart upload '{multipart_id}'"))
}

/// In-memory [`StorageProvider`] for tests.
///
/// Objects and directories live in ordered maps behind an async lock, so
/// listings come back sorted. Incoming sequences are drained before the lock
/// is taken, which lets concurrent uploads (including chunks of the same
/// multipart session) interleave freely.
///
/// Ranged downloads clamp the end of the range to the object size; a range
/// that starts past the last byte, or whose start exceeds its end, fails with
/// [`ErrorKind::InvalidRange`](nvisy_storage::ErrorKind::InvalidRange).
#[derive(Debug, Clone, Default)]
pub struct MockStorageProvider {
    config: MockStorageConfig,
    state: Arc<RwLock<MockState>>,
}

impl MockStorageProvider {
    /// Creates a new mock storage provider with the given configuration.
    pub fn new(config: MockStorageConfig) -> Self {
        Self {
            config,
            state: Arc::default(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MockStorageConfig {
        &self.config
    }

    /// Returns the number of open multipart sessions.
    pub async fn open_sessions(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    fn split(&self, data: Bytes) -> ChunkSequence<Bytes> {
        let length = data.len() as u64;
        let chunk_size = self.config.chunk_size.max(1);
        let buffers = (0..data.len())
            .step_by(chunk_size)
            .map(move |offset| Ok(data.slice(offset..(offset + chunk_size).min(data.len()))));

        ChunkSequence::new(stream::iter(buffers), Some(length))
    }
}

fn slice_range(data: Bytes, range: &ByteRange) -> Result<Bytes> {
    let (start, end) = (*range.start(), *range.end());
    let len = data.len() as u64;
    if start > end || start >= len {
        return Err(Error::invalid_range()
            .with_message(format!("range {start}..={end} outside object of {len} bytes")));
    }

    let end = end.min(len - 1);
    // Both bounds are below `len`, which came from a `usize`.
    Ok(data.slice(start as usize..=end as usize))
}

#[async_trait::async_trait]
impl StorageProvider for MockStorageProvider {
    async fn available_space(&self) -> u64 {
        let used = self.state.read().await.used_bytes();
        self.config.capacity.saturating_sub(used)
    }

    async fn upload_stream(&self, key: &str, sequence: ChunkSequence<Bytes>) -> Result<()> {
        let key = key::normalize(key)?;
        let data = sequence.collect_bytes().await?;
        let size = data.len();

        self.state.write().await.put_object(&key, data)?;

        tracing::debug!(target: TRACING_TARGET_MOCK, key = %key, size, "Object stored");
        Ok(())
    }

    async fn download_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ChunkSequence<Bytes>> {
        let key = key::normalize(key)?;
        let data = self
            .state
            .read()
            .await
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::invalid_key().with_message(format!("no object at '{key}'")))?;

        let data = match range {
            Some(range) => slice_range(data, &range)?,
            None => data,
        };

        Ok(self.split(data))
    }

    async fn exists(&self, key: &str) -> bool {
        match key::normalize(key) {
            Ok(key) => self.state.read().await.contains(&key),
            Err(_) => false,
        }
    }

    async fn size(&self, key: &str) -> u64 {
        let Ok(key) = key::normalize(key) else {
            return 0;
        };

        self.state
            .read()
            .await
            .objects
            .get(&key)
            .map_or(0, |data| data.len() as u64)
    }

    async fn copy(&self, key: &str, to: &str) -> Result<()> {
        let source = key::normalize(key)?;
        let destination = key::normalize(to)?;

        let mut state = self.state.write().await;
        let data = state.objects.get(&source).cloned().ok_or_else(|| {
            Error::invalid_key().with_message(format!("no object to copy at '{source}'"))
        })?;
        state.put_object(&destination, data)?;

        tracing::debug!(
            target: TRACING_TARGET_MOCK,
            from = %source,
            to = %destination,
            "Object copied"
        );
        Ok(())
    }

    async fn list(&self, key: Option<&str>) -> Result<Vec<String>> {
        let parent = key::normalize_parent(key)?;
        let state = self.state.read().await;

        if let Some(parent) = &parent {
            if state.objects.contains_key(parent) {
                return Ok(Vec::new());
            }
            if !state.directories.contains(parent) {
                return Err(Error::invalid_key().with_message(format!("no directory at '{parent}'")));
            }
        }

        let names: BTreeSet<&str> = state
            .objects
            .keys()
            .chain(state.directories.iter())
            .filter_map(|path| key::child_name(parent.as_deref(), path))
            .collect();

        Ok(names.into_iter().map(str::to_owned).collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key::normalize(key)?;
        let mut state = self.state.write().await;

        if state.objects.remove(&key).is_some() {
            tracing::debug!(target: TRACING_TARGET_MOCK, key = %key, "Object deleted");
            return Ok(());
        }

        if !state.directories.remove(&key) {
            return Err(Error::invalid_key().with_message(format!("nothing to delete at '{key}'")));
        }

        state.objects.retain(|path, _| !key::is_descendant(&key, path));
        state.directories.retain(|path| !key::is_descendant(&key, path));

        tracing::debug!(target: TRACING_TARGET_MOCK, key = %key, "Directory deleted");
        Ok(())
    }

    async fn create(&self, key: &str) -> Result<()> {
        let key = key::normalize(key)?;
        let mut state = self.state.write().await;

        if state.objects.contains_key(&key) {
            return Err(Error::invalid_key().with_message(format!("'{key}' is an object")));
        }

        state.create_ancestors(&key)?;
        state.directories.insert(key);
        Ok(())
    }

    async fn create_multipart_id(&self, key: &str) -> Result<MultipartId> {
        let key = key::normalize(key)?;
        let multipart_id = MultipartId::new(Uuid::now_v7().to_string());

        self.state.write().await.sessions.insert(
            multipart_id.clone(),
            MultipartSession {
                key: key.clone(),
                chunks: HashMap::new(),
            },
        );

        tracing::debug!(
            target: TRACING_TARGET_MOCK,
            key = %key,
            multipart_id = %multipart_id,
            "Multipart session opened"
        );
        Ok(multipart_id)
    }

    async fn upload_chunk_stream(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        number: u32,
        sequence: ChunkSequence<Bytes>,
    ) -> Result<StorageChunk> {
        let key = key::normalize(key)?;
        self.state.read().await.session(multipart_id, &key)?;
        if number == 0 {
            return Err(Error::invalid_multipart_chunk().with_message("chunk numbers start at 1"));
        }

        let data = sequence.collect_bytes().await?;

        // The session may have been finished or aborted while draining.
        let mut state = self.state.write().await;
        state.session(multipart_id, &key)?;

        let chunk_id = Uuid::now_v7().to_string();
        let size = data.len();
        if let Some(session) = state.sessions.get_mut(multipart_id) {
            session.chunks.insert(
                number,
                StoredChunk {
                    chunk_id: chunk_id.clone(),
                    data,
                },
            );
        }

        tracing::debug!(
            target: TRACING_TARGET_MOCK,
            key = %key,
            multipart_id = %multipart_id,
            number,
            size,
            "Multipart chunk stored"
        );
        Ok(StorageChunk::new(chunk_id, number))
    }

    async fn abort(&self, multipart_id: &MultipartId, key: &str) -> Result<()> {
        let key = key::normalize(key)?;
        let mut state = self.state.write().await;
        state.session(multipart_id, &key)?;
        state.sessions.remove(multipart_id);

        tracing::debug!(
            target: TRACING_TARGET_MOCK,
            key = %key,
            multipart_id = %multipart_id,
            "Multipart session aborted"
        );
        Ok(())
    }

    async fn finish(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        mut chunks: Vec<StorageChunk>,
    ) -> Result<()> {
        let key = key::normalize(key)?;
        let mut state = self.state.write().await;
        let session = state.session(multipart_id, &key)?;

        if chunks.is_empty() {
            return Err(Error::invalid_multipart_chunk().with_message("no chunks to assemble"));
        }
        chunks.sort_by_key(|chunk| chunk.number);

        let mut data = BytesMut::new();
        let mut previous = None;
        for chunk in &chunks {
            if previous == Some(chunk.number) {
                return Err(Error::invalid_multipart_chunk()
                    .with_message(format!("chunk {} listed twice", chunk.number)));
            }
            previous = Some(chunk.number);

            let stored = session
                .chunks
                .get(&chunk.number)
                .filter(|stored| stored.chunk_id == chunk.chunk_id)
                .ok_or_else(|| {
                    Error::invalid_multipart_chunk().with_message(format!(
                        "chunk {} ('{}') was not uploaded to this session",
                        chunk.number, chunk.chunk_id
                    ))
                })?;
            data.extend_from_slice(&stored.data);
        }

        let size = data.len();
        state.put_object(&key, data.freeze())?;
        state.sessions.remove(multipart_id);

        tracing::debug!(
            target: TRACING_TARGET_MOCK,
            key = %key,
            multipart_id = %multipart_id,
            chunks = chunks.len(),
            size,
            "Multipart session finished"
        );
        Ok(())
    }
}
