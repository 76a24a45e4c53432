//! Lazy, type-erased byte sequences.
//!
//! A [`ChunkSequence`] is what the storage contract streams in and out of
//! backends. It can be built from a stream of raw buffers, a stream of byte
//! chunks, or a stream that already yields the requested element type, and it
//! converts between the two byte representations one element at a time.

mod chunk_sequence;

pub use chunk_sequence::{ByteChunk, ChunkSequence, ItemStream};
