//! Provider doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use futures::stream;

use crate::provider::StorageProvider;
use crate::sequence::ChunkSequence;
use crate::types::{ByteRange, MultipartId, StorageChunk};
use crate::{Error, Result};

/// Records primitive calls and keeps objects in a flat map.
#[derive(Default)]
pub(crate) struct RecordingProvider {
    objects: Mutex<HashMap<String, Bytes>>,
    calls: Mutex<Vec<String>>,
    fail_delete: bool,
}

impl RecordingProvider {
    /// Creates a provider whose `delete` always fails.
    pub(crate) fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StorageProvider for RecordingProvider {
    async fn available_space(&self) -> u64 {
        u64::MAX
    }

    async fn upload_stream(&self, key: &str, sequence: ChunkSequence<Bytes>) -> Result<()> {
        self.record(format!("upload_stream:{key}:{:?}", sequence.length()));
        let data = sequence.collect_bytes().await?;
        self.objects.lock().unwrap().insert(key.to_owned(), data);
        Ok(())
    }

    async fn download_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ChunkSequence<Bytes>> {
        self.record(format!("download_stream:{key}"));
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(Error::invalid_key)?;
        let data = match range {
            Some(range) => data.slice(*range.start() as usize..=*range.end() as usize),
            None => data,
        };

        // Single-byte buffers, so collection has work to do.
        let parts: Vec<Result<Bytes>> = (0..data.len()).map(|i| Ok(data.slice(i..=i))).collect();
        Ok(ChunkSequence::new(stream::iter(parts), None))
    }

    async fn exists(&self, key: &str) -> bool {
        self.record(format!("exists:{key}"));
        self.objects.lock().unwrap().contains_key(key)
    }

    async fn size(&self, key: &str) -> u64 {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map_or(0, |data| data.len() as u64)
    }

    async fn copy(&self, key: &str, to: &str) -> Result<()> {
        self.record(format!("copy:{key}:{to}"));
        let mut objects = self.objects.lock().unwrap();
        let data = objects.get(key).cloned().ok_or_else(Error::invalid_key)?;
        objects.insert(to.to_owned(), data);
        Ok(())
    }

    async fn list(&self, _key: Option<&str>) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.record(format!("delete:{key}"));
        if self.fail_delete {
            return Err(Error::unknown().with_message("delete refused"));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn create(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn create_multipart_id(&self, _key: &str) -> Result<MultipartId> {
        Ok(MultipartId::new("session"))
    }

    async fn upload_chunk_stream(
        &self,
        multipart_id: &MultipartId,
        key: &str,
        number: u32,
        sequence: ChunkSequence<Bytes>,
    ) -> Result<StorageChunk> {
        self.record(format!(
            "upload_chunk_stream:{multipart_id}:{key}:{number}:{:?}",
            sequence.length()
        ));
        let data = sequence.collect_bytes().await?;
        Ok(StorageChunk::new(format!("chunk-{}", data.len()), number))
    }

    async fn abort(&self, multipart_id: &MultipartId, _key: &str) -> Result<()> {
        if multipart_id.as_str() != "session" {
            return Err(Error::invalid_multipart_id());
        }
        Ok(())
    }

    async fn finish(
        &self,
        _multipart_id: &MultipartId,
        _key: &str,
        _chunks: Vec<StorageChunk>,
    ) -> Result<()> {
        Ok(())
    }
}
