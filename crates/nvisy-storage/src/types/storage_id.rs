//! Identifiers used to register and look up storage providers.

use derive_more::Display;

/// Identifies a storage provider inside a [`StorageRegistry`].
///
/// [`StorageRegistry`]: crate::StorageRegistry
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Display)]
pub enum StorageId {
    /// The default storage provider.
    #[default]
    #[display("storage-id")]
    Default,
    /// A named storage provider.
    #[display("{_0}-storage-id")]
    Custom(String),
}

impl StorageId {
    /// Creates a custom identifier.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Returns the raw registry identifier.
    pub fn raw_id(&self) -> String {
        self.to_string()
    }
}
