//! Value types shared by the storage contract.

mod chunk;
mod multipart_id;
mod storage_id;

pub use chunk::StorageChunk;
pub use multipart_id::MultipartId;
pub use storage_id::StorageId;

/// Inclusive byte range used by ranged downloads.
///
/// `0..=2` addresses the first three bytes of an object.
pub type ByteRange = std::ops::RangeInclusive<u64>;
