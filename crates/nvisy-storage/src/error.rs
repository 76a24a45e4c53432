//! Storage error taxonomy.

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Backends use this to attach their own failures (I/O, SDK, transport) as the
/// source of an [`ErrorKind::Unknown`] error without this crate knowing about
/// their concrete error types.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for all storage operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that storage operations can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The key does not exist, is malformed, or the operation does not apply
    /// to it (for example copying a directory).
    InvalidKey,
    /// The supplied byte data is malformed or unreadable.
    InvalidBuffer,
    /// The multipart session is unknown, finished or aborted.
    InvalidMultipartId,
    /// The chunk list is inconsistent with the multipart session.
    InvalidMultipartChunk,
    /// The requested byte range cannot be satisfied by the object.
    InvalidRange,
    /// Any lower-level backend failure not otherwise classified.
    Unknown,
}

/// A structured error type for storage operations.
#[derive(Debug, Error)]
#[error("{kind}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid key error.
    pub fn invalid_key() -> Self {
        Self::new(ErrorKind::InvalidKey)
    }

    /// Creates a new invalid buffer error.
    pub fn invalid_buffer() -> Self {
        Self::new(ErrorKind::InvalidBuffer)
    }

    /// Creates a new invalid multipart id error.
    pub fn invalid_multipart_id() -> Self {
        Self::new(ErrorKind::InvalidMultipartId)
    }

    /// Creates a new invalid multipart chunk error.
    pub fn invalid_multipart_chunk() -> Self {
        Self::new(ErrorKind::InvalidMultipartChunk)
    }

    /// Creates a new invalid range error.
    pub fn invalid_range() -> Self {
        Self::new(ErrorKind::InvalidRange)
    }

    /// Creates a new unknown error.
    pub fn unknown() -> Self {
        Self::new(ErrorKind::Unknown)
    }

    /// Wraps a lower-level backend failure as an [`ErrorKind::Unknown`] error.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::unknown().with_source(source)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::from_source(err)
    }
}
