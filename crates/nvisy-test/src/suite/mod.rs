//! Conformance scenarios for storage providers.
//!
//! [`StorageTestSuite`] drives any [`StorageProvider`] through a fixed list
//! of scenarios covering the primitives, the derived operations and the
//! multipart protocol. Backend crates run it against a fresh provider to
//! check that they honor the contract.

mod error;

use std::sync::Arc;

use bytes::Bytes;
use futures::future;
use nvisy_storage::{
    BoxedStorageProvider, ErrorKind, MultipartId, StorageChunk, StorageExt, StorageProvider,
};
use rand::RngCore;
use uuid::Uuid;

use self::error::{ScenarioContext, ensure};
pub use self::error::{SuiteError, SuiteResult};
use crate::TRACING_TARGET_SUITE;

/// Size of the payload uploaded by the multipart scenarios.
const MULTIPART_PAYLOAD_SIZE: usize = 12 * 1024 * 1024;

/// Size of every multipart chunk except the last.
const MULTIPART_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Conformance battery for [`StorageProvider`] implementations.
///
/// Scenarios use fixed keys at the root of the provider, so the provider
/// should start empty. They can run one by one or all at once with
/// [`run_all`](Self::run_all).
///
/// # Example
///
/// ```rust,ignore
/// use nvisy_test::{MockStorageProvider, StorageTestSuite};
///
/// let suite = StorageTestSuite::new(MockStorageProvider::default());
/// suite.run_all().await?;
/// ```
#[derive(Clone)]
pub struct StorageTestSuite {
    storage: BoxedStorageProvider,
}

impl StorageTestSuite {
    /// Creates a suite for the given provider.
    pub fn new(provider: impl StorageProvider + 'static) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    /// Creates a suite for an already shared provider.
    pub fn from_shared(storage: BoxedStorageProvider) -> Self {
        Self { storage }
    }

    /// Runs every scenario concurrently and returns the first failure.
    pub async fn run_all(&self) -> SuiteResult {
        tracing::info!(target: TRACING_TARGET_SUITE, "Running storage conformance suite");

        tokio::try_join!(
            self.upload(),
            self.create(),
            self.list(),
            self.exists(),
            self.download(),
            self.download_range(),
            self.download_ranges(),
            self.list_file(),
            self.copy(),
            self.move_object(),
            self.move_missing(),
            self.multipart(),
            self.multipart_out_of_order(),
            self.multipart_abort(),
        )
        .inspect_err(|error| {
            tracing::warn!(
                target: TRACING_TARGET_SUITE,
                scenario = error.scenario,
                error = %error,
                "Storage conformance suite failed"
            );
        })?;

        tracing::info!(target: TRACING_TARGET_SUITE, "Storage conformance suite passed");
        Ok(())
    }

    /// Uploads a small object.
    pub async fn upload(&self) -> SuiteResult {
        const SCENARIO: &str = "upload";

        self.storage
            .upload(
                "test-case-01.txt",
                Bytes::from_static(b"Lorem ipsum dolor sit amet"),
            )
            .await
            .during(SCENARIO, "upload object")
    }

    /// Creates nested directories and lists each level.
    pub async fn create(&self) -> SuiteResult {
        const SCENARIO: &str = "create";

        self.storage
            .create("dir01/dir02/dir03")
            .await
            .during(SCENARIO, "create directories")?;

        self.expect_listing(SCENARIO, "dir01", &["dir02"]).await?;
        self.expect_listing(SCENARIO, "dir01/dir02", &["dir03"]).await
    }

    /// Lists a directory holding both a directory and an object.
    pub async fn list(&self) -> SuiteResult {
        const SCENARIO: &str = "list";

        self.storage
            .create("dir02/dir03")
            .await
            .during(SCENARIO, "create directory")?;
        self.storage
            .upload("dir02/test-01.txt", Bytes::from_static(b"test"))
            .await
            .during(SCENARIO, "upload object")?;

        self.expect_listing(SCENARIO, "dir02", &["dir03", "test-01.txt"])
            .await
    }

    /// Checks existence of missing keys, objects and directories.
    pub async fn exists(&self) -> SuiteResult {
        const SCENARIO: &str = "exists";

        let missing = self.storage.exists("non-existing-thing").await;
        ensure(SCENARIO, !missing, || {
            "missing key 'non-existing-thing' reported as existing".to_owned()
        })?;

        self.storage
            .upload("existing-thing/", Bytes::from_static(b"foo"))
            .await
            .during(SCENARIO, "upload object")?;
        let uploaded = self.storage.exists("existing-thing/").await;
        ensure(SCENARIO, uploaded, || {
            "uploaded key 'existing-thing/' not found".to_owned()
        })?;

        self.storage
            .create("my/dir/")
            .await
            .during(SCENARIO, "create directory")?;
        for key in ["my/dir/", "my/dir"] {
            let found = self.storage.exists(key).await;
            ensure(SCENARIO, found, || format!("directory '{key}' not found"))?;
        }

        Ok(())
    }

    /// Downloads a whole object.
    pub async fn download(&self) -> SuiteResult {
        const SCENARIO: &str = "download";

        self.upload_test_object(SCENARIO).await?;
        self.expect_content(SCENARIO, None, b"test").await
    }

    /// Downloads the tail of an object.
    pub async fn download_range(&self) -> SuiteResult {
        const SCENARIO: &str = "download_range";

        self.upload_test_object(SCENARIO).await?;
        self.expect_content(SCENARIO, Some((1, 3)), b"est").await
    }

    /// Downloads two overlapping ranges of the same object.
    pub async fn download_ranges(&self) -> SuiteResult {
        const SCENARIO: &str = "download_ranges";

        self.upload_test_object(SCENARIO).await?;
        self.expect_content(SCENARIO, Some((0, 2)), b"tes").await?;
        self.expect_content(SCENARIO, Some((2, 3)), b"st").await
    }

    /// Lists an object, which has no children.
    pub async fn list_file(&self) -> SuiteResult {
        const SCENARIO: &str = "list_file";

        self.upload_test_object(SCENARIO).await?;
        self.expect_listing(SCENARIO, TEST_OBJECT_KEY, &[]).await
    }

    /// Copies an object and checks both keys hold the same content.
    pub async fn copy(&self) -> SuiteResult {
        const SCENARIO: &str = "copy";
        let payload = Bytes::from_static(b"file storage test 02");

        self.storage
            .upload("test-02.txt", payload.clone())
            .await
            .during(SCENARIO, "upload source")?;
        self.storage
            .copy("test-02.txt", "test-03.txt")
            .await
            .during(SCENARIO, "copy object")?;

        for key in ["test-02.txt", "test-03.txt"] {
            let found = self.storage.exists(key).await;
            ensure(SCENARIO, found, || format!("'{key}' missing after copy"))?;

            let content = self
                .storage
                .download(key, None)
                .await
                .during(SCENARIO, "download copy")?;
            ensure(SCENARIO, content == payload, || {
                format!("'{key}' content differs after copy")
            })?;
        }

        Ok(())
    }

    /// Moves an object.
    pub async fn move_object(&self) -> SuiteResult {
        const SCENARIO: &str = "move";

        self.storage
            .upload("test-04.txt", Bytes::from_static(b"file storage test 04"))
            .await
            .during(SCENARIO, "upload source")?;
        self.storage
            .move_object("test-04.txt", "test-05.txt")
            .await
            .during(SCENARIO, "move object")?;

        let source = self.storage.exists("test-04.txt").await;
        ensure(SCENARIO, !source, || "source still exists after move".to_owned())?;
        let destination = self.storage.exists("test-05.txt").await;
        ensure(SCENARIO, destination, || {
            "destination missing after move".to_owned()
        })
    }

    /// Moves a key that does not exist.
    pub async fn move_missing(&self) -> SuiteResult {
        const SCENARIO: &str = "move_missing";

        let result = self
            .storage
            .move_object("test-missing.txt", "test-06.txt")
            .await;
        expect_kind(SCENARIO, result, ErrorKind::InvalidKey)?;

        let destination = self.storage.exists("test-06.txt").await;
        ensure(SCENARIO, !destination, || {
            "failed move created its destination".to_owned()
        })
    }

    /// Uploads a large payload in ascending chunks and reassembles it.
    pub async fn multipart(&self) -> SuiteResult {
        const SCENARIO: &str = "multipart";

        let payload = random_payload(MULTIPART_PAYLOAD_SIZE);
        let key = multipart_key();
        let multipart_id = self
            .storage
            .create_multipart_id(&key)
            .await
            .during(SCENARIO, "create multipart id")?;

        let mut chunks = Vec::new();
        for (number, part) in split_payload(&payload) {
            let chunk = self
                .storage
                .upload_chunk(&multipart_id, &key, number, part)
                .await
                .during(SCENARIO, "upload chunk")?;
            chunks.push(chunk);
        }

        self.finish_and_compare(SCENARIO, &multipart_id, &key, chunks, &payload)
            .await
    }

    /// Uploads chunks concurrently, last chunk first, and reassembles them.
    pub async fn multipart_out_of_order(&self) -> SuiteResult {
        const SCENARIO: &str = "multipart_out_of_order";

        let payload = random_payload(MULTIPART_PAYLOAD_SIZE);
        let key = multipart_key();
        let multipart_id = self
            .storage
            .create_multipart_id(&key)
            .await
            .during(SCENARIO, "create multipart id")?;

        let uploads = split_payload(&payload)
            .into_iter()
            .rev()
            .map(|(number, part)| self.storage.upload_chunk(&multipart_id, &key, number, part));
        let chunks = future::try_join_all(uploads)
            .await
            .during(SCENARIO, "upload chunks")?;

        self.finish_and_compare(SCENARIO, &multipart_id, &key, chunks, &payload)
            .await
    }

    /// Aborts a session and checks it can no longer be used.
    pub async fn multipart_abort(&self) -> SuiteResult {
        const SCENARIO: &str = "multipart_abort";

        let key = multipart_key();
        let multipart_id = self
            .storage
            .create_multipart_id(&key)
            .await
            .during(SCENARIO, "create multipart id")?;
        let chunk = self
            .storage
            .upload_chunk(&multipart_id, &key, 1, Bytes::from_static(b"discarded"))
            .await
            .during(SCENARIO, "upload chunk")?;
        self.storage
            .abort(&multipart_id, &key)
            .await
            .during(SCENARIO, "abort")?;

        let result = self
            .storage
            .upload_chunk(&multipart_id, &key, 2, Bytes::from_static(b"late"))
            .await;
        expect_kind(SCENARIO, result, ErrorKind::InvalidMultipartId)?;

        let result = self.storage.finish(&multipart_id, &key, vec![chunk]).await;
        expect_kind(SCENARIO, result, ErrorKind::InvalidMultipartId)?;

        let found = self.storage.exists(&key).await;
        ensure(SCENARIO, !found, || {
            format!("aborted upload left an object at '{key}'")
        })
    }

    async fn upload_test_object(&self, scenario: &'static str) -> SuiteResult {
        self.storage
            .upload(TEST_OBJECT_KEY, Bytes::from_static(b"test"))
            .await
            .during(scenario, "upload object")
    }

    async fn expect_listing(
        &self,
        scenario: &'static str,
        key: &str,
        expected: &[&str],
    ) -> SuiteResult {
        let names = self
            .storage
            .list(Some(key))
            .await
            .during(scenario, "list")?;

        ensure(scenario, names == expected, || {
            format!("listing '{key}' returned {names:?}, expected {expected:?}")
        })
    }

    async fn expect_content(
        &self,
        scenario: &'static str,
        range: Option<(u64, u64)>,
        expected: &[u8],
    ) -> SuiteResult {
        let content = self
            .storage
            .download(TEST_OBJECT_KEY, range.map(|(start, end)| start..=end))
            .await
            .during(scenario, "download")?;

        ensure(scenario, content == expected, || {
            format!("downloaded {content:?} for range {range:?}, expected {expected:?}")
        })
    }

    async fn finish_and_compare(
        &self,
        scenario: &'static str,
        multipart_id: &MultipartId,
        key: &str,
        chunks: Vec<StorageChunk>,
        payload: &Bytes,
    ) -> SuiteResult {
        self.storage
            .finish(multipart_id, key, chunks)
            .await
            .during(scenario, "finish")?;

        let content = self
            .storage
            .download(key, None)
            .await
            .during(scenario, "download assembled object")?;

        ensure(scenario, content == payload, || {
            format!(
                "assembled object has {} bytes, expected {} matching bytes",
                content.len(),
                payload.len()
            )
        })
    }
}

impl std::fmt::Debug for StorageTestSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageTestSuite").finish_non_exhaustive()
    }
}

/// Object shared by the download and listing scenarios.
const TEST_OBJECT_KEY: &str = "dir04/test-01.txt";

fn multipart_key() -> String {
    format!("multipart-{}.data", Uuid::now_v7())
}

fn random_payload(size: usize) -> Bytes {
    let mut payload = vec![0; size];
    rand::rng().fill_bytes(&mut payload);
    Bytes::from(payload)
}

/// Splits `payload` into numbered chunks, the last one holding the remainder.
fn split_payload(payload: &Bytes) -> Vec<(u32, Bytes)> {
    (0..payload.len())
        .step_by(MULTIPART_CHUNK_SIZE)
        .zip(1..)
        .map(|(offset, number)| {
            let end = (offset + MULTIPART_CHUNK_SIZE).min(payload.len());
            (number, payload.slice(offset..end))
        })
        .collect()
}

fn expect_kind<T>(
    scenario: &'static str,
    result: nvisy_storage::Result<T>,
    expected: ErrorKind,
) -> SuiteResult {
    match result {
        Err(error) if error.kind() == expected => Ok(()),
        Err(error) => Err(SuiteError::new(
            scenario,
            format!("expected {expected} error, got {}", error.kind()),
        )
        .with_source(error)),
        Ok(_) => Err(SuiteError::new(
            scenario,
            format!("expected {expected} error, operation succeeded"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use nvisy_storage::{ByteRange, ChunkSequence, Result, StorageService};

    use super::*;
    use crate::MockStorageProvider;

    #[tokio::test]
    async fn mock_passes_every_scenario() {
        let suite = StorageTestSuite::new(MockStorageProvider::default());
        suite.run_all().await.unwrap();
    }

    #[tokio::test]
    async fn logging_service_passes_every_scenario() {
        let service = StorageService::new(MockStorageProvider::default())
            .with_service_name("conformance");
        StorageTestSuite::new(service).run_all().await.unwrap();
    }

    #[tokio::test]
    async fn scenarios_are_repeatable() {
        let suite = StorageTestSuite::new(MockStorageProvider::default());
        suite.copy().await.unwrap();
        suite.copy().await.unwrap();
        suite.multipart_abort().await.unwrap();
        suite.multipart_abort().await.unwrap();
    }

    #[test]
    fn payload_splits_into_five_mib_chunks() {
        let payload = random_payload(MULTIPART_PAYLOAD_SIZE);
        let parts = split_payload(&payload);

        let layout: Vec<(u32, usize)> = parts.iter().map(|(n, p)| (*n, p.len())).collect();
        assert_eq!(
            layout,
            vec![
                (1, MULTIPART_CHUNK_SIZE),
                (2, MULTIPART_CHUNK_SIZE),
                (3, 2 * 1024 * 1024),
            ]
        );
    }

    /// Delegates to the mock but returns directory listings in reverse order.
    struct ReversedListing(MockStorageProvider);

    #[async_trait::async_trait]
    impl StorageProvider for ReversedListing {
        async fn available_space(&self) -> u64 {
            self.0.available_space().await
        }

        async fn upload_stream(&self, key: &str, sequence: ChunkSequence<Bytes>) -> Result<()> {
            self.0.upload_stream(key, sequence).await
        }

        async fn download_stream(
            &self,
            key: &str,
            range: Option<ByteRange>,
        ) -> Result<ChunkSequence<Bytes>> {
            self.0.download_stream(key, range).await
        }

        async fn exists(&self, key: &str) -> bool {
            self.0.exists(key).await
        }

        async fn size(&self, key: &str) -> u64 {
            self.0.size(key).await
        }

        async fn copy(&self, key: &str, to: &str) -> Result<()> {
            self.0.copy(key, to).await
        }

        async fn list(&self, key: Option<&str>) -> Result<Vec<String>> {
            let mut names = self.0.list(key).await?;
            names.reverse();
            Ok(names)
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.0.delete(key).await
        }

        async fn create(&self, key: &str) -> Result<()> {
            self.0.create(key).await
        }

        async fn create_multipart_id(&self, key: &str) -> Result<MultipartId> {
            self.0.create_multipart_id(key).await
        }

        async fn upload_chunk_stream(
            &self,
            multipart_id: &MultipartId,
            key: &str,
            number: u32,
            sequence: ChunkSequence<Bytes>,
        ) -> Result<StorageChunk> {
            self.0
                .upload_chunk_stream(multipart_id, key, number, sequence)
                .await
        }

        async fn abort(&self, multipart_id: &MultipartId, key: &str) -> Result<()> {
            self.0.abort(multipart_id, key).await
        }

        async fn finish(
            &self,
            multipart_id: &MultipartId,
            key: &str,
            chunks: Vec<StorageChunk>,
        ) -> Result<()> {
            self.0.finish(multipart_id, key, chunks).await
        }
    }

    #[tokio::test]
    async fn unordered_listing_is_reported() {
        let suite = StorageTestSuite::new(ReversedListing(MockStorageProvider::default()));

        let error = suite.list().await.unwrap_err();
        assert_eq!(error.scenario, "list");
        assert!(error.reason.contains("test-01.txt"), "{}", error.reason);
        assert!(error.source.is_none());

        let error = suite.run_all().await.unwrap_err();
        assert_eq!(error.scenario, "list");
    }
}
