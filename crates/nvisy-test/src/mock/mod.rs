//! In-memory storage backend for testing.
//!
//! [`MockStorageProvider`] keeps objects, directories and multipart sessions
//! in memory and implements the whole storage contract, so it can stand in
//! for a real backend in unit and integration tests.

mod key;
mod storage;

use nvisy_storage::{StorageId, StorageRegistry};
pub use storage::{MockStorageConfig, MockStorageProvider};

/// Creates a registry holding a default mock storage provider.
///
/// The provider is registered under [`StorageId::Default`].
pub async fn create_mock_registry() -> StorageRegistry {
    let registry = StorageRegistry::new();
    registry
        .register(StorageId::Default, MockStorageProvider::default())
        .await;
    registry
}
