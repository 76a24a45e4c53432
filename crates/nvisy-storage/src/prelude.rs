//! Convenience re-exports.

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::ext::StorageExt;
pub use crate::provider::{BoxedStorageProvider, StorageProvider};
pub use crate::registry::StorageRegistry;
pub use crate::sequence::{ByteChunk, ChunkSequence};
pub use crate::service::StorageService;
pub use crate::types::{ByteRange, MultipartId, StorageChunk, StorageId};
