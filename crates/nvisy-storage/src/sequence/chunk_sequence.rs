//! One-shot chunk sequence with on-demand element conversion.

use std::fmt;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};

use crate::Result;

/// A contiguous slice of bytes owned by the consumer.
pub type ByteChunk = Vec<u8>;

/// A boxed stream of fallible items.
pub type ItemStream<T> = BoxStream<'static, Result<T>>;

/// Upper bound on the capacity reserved up front from a length hint.
const PREALLOCATE_LIMIT: usize = 16 * 1024 * 1024;

type MakeStream<T> = Box<dyn FnOnce() -> ItemStream<T> + Send>;

enum State<T> {
    /// The producer has not been polled yet.
    Pending(MakeStream<T>),
    /// The producer is being drained.
    Active(ItemStream<T>),
    /// The producer is exhausted or failed.
    Done,
}

/// A lazy, forward-only sequence of byte elements with an optional length hint.
///
/// The sequence owns the producer it was built from and only starts it on the
/// first poll. It is one-shot: once it has returned `None`, or has yielded an
/// error, every further poll returns `None`.
///
/// `length` is the expected total number of bytes, when known. It is a hint
/// for pre-allocating destination buffers and is never checked against the
/// bytes actually produced.
pub struct ChunkSequence<T> {
    state: State<T>,
    length: Option<u64>,
}

impl<T: Send + 'static> ChunkSequence<T> {
    /// Wraps a stream that already yields the element type.
    pub fn new<S>(stream: S, length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self::from_factory(move || stream.boxed(), length)
    }

    /// Creates a sequence that yields no elements.
    pub fn empty() -> Self {
        Self::new(stream::empty(), Some(0))
    }

    fn from_factory<F>(make: F, length: Option<u64>) -> Self
    where
        F: FnOnce() -> ItemStream<T> + Send + 'static,
    {
        Self {
            state: State::Pending(Box::new(make)),
            length,
        }
    }
}

impl<T> ChunkSequence<T> {
    /// Returns the expected total length in bytes, if known.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Replaces the length hint.
    pub fn with_length(mut self, length: Option<u64>) -> Self {
        self.length = length;
        self
    }

    /// Returns `true` once the sequence has been exhausted or has failed.
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

impl<T: AsRef<[u8]>> ChunkSequence<T> {
    /// Drains the whole sequence into a single buffer.
    ///
    /// The length hint is only used to reserve capacity; there is no upper
    /// bound on the number of bytes collected.
    pub async fn collect_bytes(mut self) -> Result<Bytes> {
        let capacity = self
            .length
            .and_then(|length| usize::try_from(length).ok())
            .unwrap_or_default()
            .min(PREALLOCATE_LIMIT);

        let mut buffer = BytesMut::with_capacity(capacity);
        while let Some(element) = self.next().await {
            buffer.extend_from_slice(element?.as_ref());
        }

        Ok(buffer.freeze())
    }
}

impl ChunkSequence<ByteChunk> {
    /// Wraps a stream of raw buffers, draining each one into a byte chunk.
    ///
    /// Every pulled buffer produces a chunk of exactly its remaining length;
    /// an empty buffer produces an empty chunk rather than ending the sequence.
    pub fn from_buffers<S, B>(stream: S, length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<B>> + Send + 'static,
        B: Buf + Send + 'static,
    {
        Self::from_factory(
            move || stream.map(|item| item.map(drain_buffer)).boxed(),
            length,
        )
    }

    /// Re-wraps the chunks as raw buffers, keeping the length hint.
    pub fn into_buffers(self) -> ChunkSequence<Bytes> {
        let length = self.length;
        ChunkSequence::from_chunks(self, length)
    }
}

impl ChunkSequence<Bytes> {
    /// Wraps a stream of byte chunks, copying each into a fresh buffer.
    pub fn from_chunks<S>(stream: S, length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<ByteChunk>> + Send + 'static,
    {
        Self::from_factory(
            move || stream.map(|item| item.map(fill_buffer)).boxed(),
            length,
        )
    }

    /// Wraps a single buffer.
    ///
    /// The sequence yields the buffer once, or nothing at all when the buffer
    /// is empty. The length hint is the buffer's byte length.
    pub fn from_buffer(buffer: Bytes) -> Self {
        let length = buffer.len() as u64;
        let element = (!buffer.is_empty()).then_some(Ok(buffer));
        Self::new(stream::iter(element), Some(length))
    }

    /// Re-wraps the buffers as byte chunks, keeping the length hint.
    pub fn into_chunks(self) -> ChunkSequence<ByteChunk> {
        let length = self.length;
        ChunkSequence::from_buffers(self, length)
    }
}

fn drain_buffer<B: Buf>(mut buffer: B) -> ByteChunk {
    let mut chunk = vec![0; buffer.remaining()];
    buffer.copy_to_slice(&mut chunk);
    chunk
}

fn fill_buffer(chunk: ByteChunk) -> Bytes {
    let mut buffer = BytesMut::with_capacity(chunk.len());
    buffer.put_slice(&chunk);
    buffer.freeze()
}

impl<T> Stream for ChunkSequence<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if matches!(this.state, State::Pending(_))
            && let State::Pending(make) = mem::replace(&mut this.state, State::Done)
        {
            this.state = State::Active(make());
        }

        let State::Active(stream) = &mut this.state else {
            return Poll::Ready(None);
        };

        match ready!(stream.as_mut().poll_next(cx)) {
            Some(Ok(element)) => Poll::Ready(Some(Ok(element))),
            Some(Err(error)) => {
                this.state = State::Done;
                Poll::Ready(Some(Err(error)))
            }
            None => {
                this.state = State::Done;
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.state {
            State::Pending(_) => (0, None),
            State::Active(stream) => stream.size_hint(),
            State::Done => (0, Some(0)),
        }
    }
}

impl<T> Unpin for ChunkSequence<T> {}

impl<T> fmt::Debug for ChunkSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Pending(_) => "pending",
            State::Active(_) => "active",
            State::Done => "done",
        };

        f.debug_struct("ChunkSequence")
            .field("state", &state)
            .field("length", &self.length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::TryStreamExt;

    use super::*;
    use crate::Error;

    fn buffers(parts: &[&'static [u8]]) -> Vec<Result<Bytes>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p))).collect()
    }

    #[tokio::test]
    async fn buffers_drain_into_exact_chunks() {
        let source = stream::iter(buffers(&[b"lorem", b"", b"ipsum"]));
        let sequence = ChunkSequence::from_buffers(source, Some(10));

        assert_eq!(sequence.length(), Some(10));
        let chunks: Vec<ByteChunk> = sequence.try_collect().await.unwrap();
        assert_eq!(chunks, vec![b"lorem".to_vec(), Vec::new(), b"ipsum".to_vec()]);
    }

    #[tokio::test]
    async fn partially_read_buffers_only_yield_remaining_bytes() {
        let mut buffer = Bytes::from_static(b"header:body");
        buffer.advance(7);

        let sequence = ChunkSequence::from_buffers(stream::iter([Ok(buffer)]), None);
        let chunks: Vec<ByteChunk> = sequence.try_collect().await.unwrap();
        assert_eq!(chunks, vec![b"body".to_vec()]);
    }

    #[tokio::test]
    async fn chunks_copy_into_sized_buffers() {
        let source = stream::iter(vec![Ok(b"dolor".to_vec()), Ok(b" sit".to_vec())]);
        let sequence = ChunkSequence::from_chunks(source, None);

        let buffers: Vec<Bytes> = sequence.try_collect().await.unwrap();
        assert_eq!(buffers.len(), 2);
        assert_eq!(&buffers[0][..], b"dolor");
        assert_eq!(&buffers[1][..], b" sit");
    }

    #[tokio::test]
    async fn matching_elements_pass_through() {
        let source = stream::iter(buffers(&[b"a", b"bc"]));
        let sequence = ChunkSequence::new(source, Some(3));

        let collected = sequence.collect_bytes().await.unwrap();
        assert_eq!(&collected[..], b"abc");
    }

    #[tokio::test]
    async fn producer_starts_on_first_poll() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let source = stream::once(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"x"))
        });

        let mut sequence = ChunkSequence::new(source, None);
        assert_eq!(started.load(Ordering::SeqCst), 0);

        assert!(sequence.next().await.is_some());
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_sequence_stays_empty() {
        let mut sequence = ChunkSequence::from_buffer(Bytes::from_static(b"once"));

        assert_eq!(&sequence.next().await.unwrap().unwrap()[..], b"once");
        assert!(sequence.next().await.is_none());
        assert!(sequence.is_terminated());
        assert!(sequence.next().await.is_none());
    }

    #[tokio::test]
    async fn failure_terminates_the_sequence() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"first")),
            Err(Error::invalid_buffer()),
            Ok(Bytes::from_static(b"never")),
        ]);
        let mut sequence = ChunkSequence::new(source, None).into_chunks();

        assert_eq!(sequence.next().await.unwrap().unwrap(), b"first".to_vec());
        let error = sequence.next().await.unwrap().unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::InvalidBuffer);
        assert!(sequence.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_buffer_yields_nothing() {
        let mut sequence = ChunkSequence::from_buffer(Bytes::new());
        assert_eq!(sequence.length(), Some(0));
        assert!(sequence.next().await.is_none());
    }

    #[tokio::test]
    async fn conversion_round_trip_preserves_bytes() {
        let parts: &[&'static [u8]] = &[b"The quick ", b"", b"brown fox ", b"jumps"];
        let expected: Vec<u8> = parts.concat();

        let sequence = ChunkSequence::new(stream::iter(buffers(parts)), Some(expected.len() as u64));
        let round_trip = sequence.into_chunks().into_buffers();
        assert_eq!(round_trip.length(), Some(expected.len() as u64));

        let collected = round_trip.collect_bytes().await.unwrap();
        assert_eq!(&collected[..], &expected[..]);
    }

    #[tokio::test]
    async fn wrong_length_hint_is_ignored() {
        let sequence = ChunkSequence::from_buffer(Bytes::from_static(b"12345")).with_length(Some(1));
        let collected = sequence.collect_bytes().await.unwrap();
        assert_eq!(collected.len(), 5);

        let sequence = ChunkSequence::<Bytes>::empty().with_length(Some(u64::MAX));
        assert!(sequence.collect_bytes().await.unwrap().is_empty());
    }
}
