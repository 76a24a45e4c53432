//! Opaque multipart session identifier.

use derive_more::{AsRef, Display, From, Into};
use serde::{Deserialize, Serialize};

/// Identifier of an open multipart upload session.
///
/// The value is chosen by the backend and is only ever compared and stored,
/// never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, AsRef, Display, From, Into)]
#[serde(transparent)]
#[as_ref(str)]
pub struct MultipartId(String);

impl MultipartId {
    /// Wraps a backend-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MultipartId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}
