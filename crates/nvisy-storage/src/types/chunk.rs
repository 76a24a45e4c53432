//! Multipart chunk receipts.

use serde::{Deserialize, Serialize};

/// A receipt for one uploaded part of a multipart upload.
///
/// The `chunk_id` is assigned by the backend and must be handed back
/// unmodified when the upload is finished; the `number` is assigned by the
/// caller, starts at `1`, and determines the order in which chunks are
/// assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChunk {
    /// Opaque backend-assigned chunk identifier.
    pub chunk_id: String,
    /// Caller-assigned, 1-based part number.
    pub number: u32,
}

impl StorageChunk {
    /// Creates a new chunk receipt.
    pub fn new(chunk_id: impl Into<String>, number: u32) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_uses_both_fields() {
        let a = StorageChunk::new("etag-1", 1);
        assert_eq!(a, StorageChunk::new("etag-1", 1));
        assert_ne!(a, StorageChunk::new("etag-1", 2));
        assert_ne!(a, StorageChunk::new("etag-2", 1));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let chunk = StorageChunk::new("etag-7", 7);
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json, serde_json::json!({ "chunkId": "etag-7", "number": 7 }));

        let back: StorageChunk = serde_json::from_value(json).unwrap();
        assert_eq!(back, chunk);
    }
}
