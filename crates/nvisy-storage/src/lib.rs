#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the logging [`StorageService`] wrapper.
///
/// Use this target for logging storage calls, their outcome and multipart
/// session transitions.
pub const TRACING_TARGET_SERVICE: &str = "nvisy_storage::service";

/// Tracing target for [`StorageRegistry`] operations.
///
/// Use this target for logging provider registration and removal.
pub const TRACING_TARGET_REGISTRY: &str = "nvisy_storage::registry";

mod error;
mod ext;
mod provider;
mod registry;
mod service;
#[cfg(test)]
mod testing;

/// Lazy chunk sequences and their element conversions.
pub mod sequence;
/// Value types: chunks, multipart ids, storage ids and byte ranges.
pub mod types;

#[doc(hidden)]
pub mod prelude;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use ext::StorageExt;
pub use provider::{BoxedStorageProvider, StorageProvider};
pub use registry::StorageRegistry;
pub use sequence::{ByteChunk, ChunkSequence};
pub use service::StorageService;
pub use types::{ByteRange, MultipartId, StorageChunk, StorageId};
