//! Error taxonomy for container parsing and writing.
//!
//! Every variant except `PositionOutOfRange` is fatal: `open` aborts, the
//! byte source is released, and no reader is returned. `PositionOutOfRange`
//! is the one recoverable kind; it leaves an already-open reader fully
//! usable and the caller may retry with a valid position.

use std::io;

/// Errors produced by the chunk scanner, frame cursor, and writer.
#[derive(Debug, thiserror::Error)]
pub enum WsigError {
    /// The stream does not start with the RIFF container tag.
    #[error("file does not start with RIFF id")]
    NotAContainer,

    /// The variant tag is neither `WAVE` nor `WSIG`.
    #[error("not a SESANE or WAVE file (variant tag {tag:?})")]
    UnsupportedVariant { tag: String },

    /// The format chunk declares a non-PCM encoding.
    #[error("unknown format: {tag:#06x} (only linear PCM is supported)")]
    UnsupportedEncoding { tag: u16 },

    /// A descriptor chunk resolved to zero channels.
    #[error("bad # of channels")]
    BadChannelCount,

    /// A descriptor chunk resolved to a zero-byte sample width.
    #[error("bad sample width")]
    BadSampleWidth,

    /// A data chunk appeared before its prerequisite descriptor chunk.
    #[error("data chunk before {required} chunk")]
    ChunkOrder { required: &'static str },

    /// End of stream was reached before the variant's required chunks.
    #[error("{required} missing")]
    MissingRequiredChunk { required: &'static str },

    /// A chunk is shorter than its fixed record layout.
    #[error("{tag} chunk too short: expected {expected} bytes, got {actual}")]
    MalformedRecord {
        tag: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A read was attempted past the declared end of a chunk.
    #[error(
        "read past declared end of {tag} chunk at offset {offset}: \
         requested {requested} bytes, {available} remain"
    )]
    TruncatedChunk {
        tag: String,
        offset: u64,
        requested: usize,
        available: u64,
    },

    /// `set_pos` was called with a frame index past the end of the data.
    #[error("position {pos} not in range 0..={max}")]
    PositionOutOfRange { pos: u64, max: u64 },

    /// The writer was handed a buffer element kind it cannot serialize.
    #[error("unsupported sample kind: {kind}")]
    UnsupportedSampleKind { kind: &'static str },

    /// A descriptor text field contains bytes outside ASCII.
    #[error("{field} field is not valid ASCII")]
    NonAsciiText { field: &'static str },

    /// Underlying source or sink failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WsigError {
    /// Returns true for the one error kind that leaves an open reader usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WsigError::PositionOutOfRange { .. })
    }
}

/// Result type for all container operations.
pub type WsigResult<T> = Result<T, WsigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WsigError::NotAContainer;
        assert_eq!(format!("{}", err), "file does not start with RIFF id");

        let err = WsigError::ChunkOrder { required: "sdsc" };
        assert_eq!(format!("{}", err), "data chunk before sdsc chunk");

        let err = WsigError::PositionOutOfRange { pos: 12, max: 10 };
        assert_eq!(format!("{}", err), "position 12 not in range 0..=10");
    }

    #[test]
    fn test_only_setpos_is_recoverable() {
        assert!(WsigError::PositionOutOfRange { pos: 1, max: 0 }.is_recoverable());
        assert!(!WsigError::NotAContainer.is_recoverable());
        assert!(!WsigError::BadSampleWidth.is_recoverable());
    }

    #[test]
    fn test_error_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WsigError>();
    }
}
