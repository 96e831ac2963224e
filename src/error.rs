//! Unified error types for detection and extraction.

use std::io;

/// Unified error type for detection and extraction operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No registered magic pattern matched the stream's leading bytes.
    #[error("unknown image format")]
    UnknownFormat,

    /// Magic matched, but the stream is structurally impossible for the
    /// format (e.g. a bad PNG signature after all).
    #[error("invalid {format} stream: {detail}")]
    InvalidFormat {
        format: &'static str,
        detail: &'static str,
    },

    /// Container-level structural violation (unexpected chunk vocabulary,
    /// truncated chunk headers, wrong form type).
    #[error("malformed {format} container: {detail}")]
    MalformedContainer {
        format: &'static str,
        detail: &'static str,
    },

    /// Extraction was asked to deanimate an image with no animation frames.
    #[error("{format} image is not animated")]
    NotAnimated { format: &'static str },

    /// The stream ended before a complete first frame was observed.
    ///
    /// Callers polling a growing source (e.g. an in-progress download) can
    /// treat this as "retry once more bytes arrive".
    #[error("stream ended before the first frame was complete")]
    Underflow,

    /// The buffer passed to `read_window` does not match the configured
    /// window size. This is a programmer error, not a stream condition.
    #[error("window buffer is {actual} bytes, expected {expected}")]
    WindowLength { expected: usize, actual: usize },

    /// Error from the underlying stream.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Underlying codec error (GIF decode / PNG re-encode).
    #[error("{format} codec error: {source}")]
    Codec {
        format: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Wrap a codec-specific error.
    pub fn from_codec<E>(format: &'static str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Codec {
            format,
            source: Box::new(error),
        }
    }

    /// Whether this error means "not enough data arrived yet" rather than
    /// structural corruption.
    pub fn is_underflow(&self) -> bool {
        match self {
            Error::Underflow => true,
            Error::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
