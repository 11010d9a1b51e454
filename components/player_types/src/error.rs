//! Error types for media-core operations.

use thiserror::Error;

/// Errors produced by the media-core runtime.
///
/// Mirrors the error taxonomy a playback core reports: transient
/// conditions the caller should retry (`WouldBlock`), terminal per-track
/// conditions (`EndOfStream`), and hard failures surfaced to the listener.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlayerError {
    /// The operation would block; the caller should retry later. Never
    /// surfaced to the user-facing listener.
    #[error("would block")]
    WouldBlock,

    /// The track has reached end-of-stream.
    #[error("end of stream")]
    EndOfStream,

    /// Invalid arguments or malformed format.
    #[error("bad value: {0}")]
    BadValue(String),

    /// Operation attempted before required setup completed.
    #[error("not initialized: {0}")]
    NoInit(String),

    /// The codec, sink, or format requested is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Allocation failure.
    #[error("out of memory")]
    NoMemory,

    /// The operation timed out.
    #[error("timed out")]
    TimedOut,

    /// The operation is invalid in the current state (e.g. seeking a
    /// source that does not support seeking).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Fallback for anything else; always logged with an origin tag at
    /// the call site before being wrapped here.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Convenience alias for media-core results.
pub type PlayerResult<T> = Result<T, PlayerError>;

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for PlayerError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        PlayerError::NoInit("message loop has shut down".to_string())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for PlayerError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        PlayerError::NoInit("reply channel dropped before responding".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn would_block_is_distinct_from_unknown() {
        assert_ne!(PlayerError::WouldBlock, PlayerError::Unknown("x".into()));
    }

    #[test]
    fn display_includes_detail() {
        let err = PlayerError::BadValue("negative pts".to_string());
        assert_eq!(err.to_string(), "bad value: negative pts");
    }
}
