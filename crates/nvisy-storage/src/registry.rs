//! Identifier-keyed lookup of storage services.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::provider::StorageProvider;
use crate::service::StorageService;
use crate::types::StorageId;
use crate::{Error, Result, TRACING_TARGET_REGISTRY};

/// A shared map from [`StorageId`] to [`StorageService`].
///
/// Cloning the registry yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct StorageRegistry {
    services: Arc<RwLock<HashMap<StorageId, StorageService>>>,
}

impl StorageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under `id`, replacing any previous registration.
    ///
    /// The service name of the wrapping [`StorageService`] is the raw id.
    pub async fn register(&self, id: StorageId, provider: impl StorageProvider + 'static) {
        let service = StorageService::new(provider).with_service_name(id.raw_id());
        self.insert(id, service).await;
    }

    /// Registers the provider built by `recipe` under `id`.
    ///
    /// The recipe runs once, immediately; a failing recipe leaves the
    /// registry untouched.
    pub async fn register_with<F, P>(&self, id: StorageId, recipe: F) -> Result<()>
    where
        F: FnOnce() -> Result<P>,
        P: StorageProvider + 'static,
    {
        let provider = recipe().inspect_err(|error| {
            tracing::warn!(
                target: TRACING_TARGET_REGISTRY,
                id = %id,
                error = %error,
                "Storage provider construction failed"
            );
        })?;

        self.register(id, provider).await;
        Ok(())
    }

    /// Registers an already configured service under `id`.
    pub async fn insert(&self, id: StorageId, service: StorageService) {
        tracing::info!(
            target: TRACING_TARGET_REGISTRY,
            id = %id,
            service = service.service_name(),
            "Storage provider registered"
        );

        self.services.write().await.insert(id, service);
    }

    /// Returns the service registered under `id`, if any.
    pub async fn get(&self, id: &StorageId) -> Option<StorageService> {
        self.services.read().await.get(id).cloned()
    }

    /// Returns the service registered under `id`.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Unknown`](crate::ErrorKind::Unknown) when
    /// nothing is registered under `id`.
    pub async fn require(&self, id: &StorageId) -> Result<StorageService> {
        self.get(id).await.ok_or_else(|| {
            Error::unknown().with_message(format!("storage provider '{id}' is not registered"))
        })
    }

    /// Removes and returns the service registered under `id`.
    pub async fn remove(&self, id: &StorageId) -> Option<StorageService> {
        let removed = self.services.write().await.remove(id);
        if removed.is_some() {
            tracing::info!(
                target: TRACING_TARGET_REGISTRY,
                id = %id,
                "Storage provider removed"
            );
        }
        removed
    }

    /// Returns `true` if a service is registered under `id`.
    pub async fn contains(&self, id: &StorageId) -> bool {
        self.services.read().await.contains_key(id)
    }

    /// Returns every registered identifier.
    pub async fn ids(&self) -> Vec<StorageId> {
        self.services.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::testing::RecordingProvider;
    use crate::{ErrorKind, StorageExt};

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = StorageRegistry::new();
        registry
            .register(StorageId::Default, RecordingProvider::default())
            .await;

        assert!(registry.contains(&StorageId::Default).await);
        assert!(registry.get(&StorageId::custom("avatars")).await.is_none());

        let storage = registry.require(&StorageId::Default).await.unwrap();
        assert_eq!(storage.service_name(), "storage-id");
    }

    #[tokio::test]
    async fn require_missing_is_unknown() {
        let registry = StorageRegistry::new();
        let error = registry
            .require(&StorageId::custom("avatars"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Unknown);
        assert!(error.to_string().contains("avatars-storage-id"));
    }

    #[tokio::test]
    async fn failing_recipe_registers_nothing() {
        let registry = StorageRegistry::new();
        let result = registry
            .register_with(StorageId::Default, || -> Result<RecordingProvider> {
                Err(Error::unknown().with_message("no credentials"))
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unknown);
        assert!(registry.ids().await.is_empty());

        registry
            .register_with(StorageId::Default, || Ok(RecordingProvider::default()))
            .await
            .unwrap();
        assert_eq!(registry.ids().await, vec![StorageId::Default]);
    }

    #[tokio::test]
    async fn clones_share_registrations() {
        let registry = StorageRegistry::new();
        let clone = registry.clone();
        let id = StorageId::custom("docs");

        clone.register(id.clone(), RecordingProvider::default()).await;
        let storage = registry.require(&id).await.unwrap();
        storage
            .upload("a.txt", Bytes::from_static(b"x"))
            .await
            .unwrap();

        // Every lookup returns a handle to the same provider.
        let again = clone.require(&id).await.unwrap();
        assert!(again.exists("a.txt").await);

        assert!(registry.remove(&id).await.is_some());
        assert!(!clone.contains(&id).await);
        assert!(clone.remove(&id).await.is_none());
    }

    #[tokio::test]
    async fn insert_keeps_custom_service_name() {
        let registry = StorageRegistry::new();
        let service = StorageService::new(RecordingProvider::default()).with_service_name("cold");
        registry.insert(StorageId::custom("archive"), service).await;

        let storage = registry.require(&StorageId::custom("archive")).await.unwrap();
        assert_eq!(storage.service_name(), "cold");
    }
}
