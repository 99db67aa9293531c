//! Error types for tracker-bridge.

use thiserror::Error;

use crate::protocol::{Operation, HEADER_SIZE};

/// Main error type for all bridge operations.
///
/// Variants are split by their effect on the connection: construction and
/// codec errors never touch it, while every send/receive failure below is
/// returned only after the connection has been closed. `Io` and `Timeout`
/// from [`connect`](crate::transport::connect) or
/// [`Server::bind`](crate::server::Server::bind) are returned before any
/// connection exists.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The operation has no tag in the registry.
    #[error("operation not supported: {0}")]
    UnsupportedOperation(Operation),

    /// A registry entry was rejected (reserved value or duplicate).
    #[error("invalid operation registration: {0}")]
    InvalidRegistration(String),

    /// Fewer header+metadata bytes reached the stream than were encoded.
    #[error("error sending head bytes: wrote {written} of {expected}")]
    ShortHeaderWrite { written: usize, expected: usize },

    /// The body writer callback failed.
    #[error("error sending body bytes: {0}")]
    ShortBodyWrite(#[source] Box<BridgeError>),

    /// Short read, zero-byte read or end of stream before the buffer was full.
    #[error("error reading bytes: got {read} of {expected}")]
    ReadFailure { expected: usize, read: usize },

    /// Declared metadata length exceeds the configured limit.
    #[error("metadata too large: {size} bytes (max {max})")]
    MetaTooLarge { size: u64, max: u64 },

    /// Announced body exceeds what a buffering handler accepts.
    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: u64, max: u64 },

    /// I/O attempted on a connection that has already been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Connecting to a peer did not finish in time.
    #[error("timed out connecting to {0}")]
    Timeout(String),

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON metadata encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack metadata encode error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack metadata decode error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

impl BridgeError {
    /// True for errors that leave the bridge's connection closed.
    ///
    /// Also true for `Io` out of `connect` or `Server::bind`, where there is
    /// no connection to tear down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ShortHeaderWrite { .. }
                | Self::ShortBodyWrite(_)
                | Self::ReadFailure { .. }
                | Self::MetaTooLarge { .. }
                | Self::BodyTooLarge { .. }
                | Self::ConnectionClosed
                | Self::Io(_)
        )
    }

    /// True when the peer hung up before sending any byte of the next header.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ReadFailure { expected: HEADER_SIZE, read: 0 } | Self::ConnectionClosed
        )
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_write_errors_have_distinct_messages() {
        let head = BridgeError::ShortHeaderWrite {
            written: 3,
            expected: 18,
        };
        let body = BridgeError::ShortBodyWrite(Box::new(BridgeError::ConnectionClosed));

        assert!(head.to_string().contains("head bytes"));
        assert!(body.to_string().contains("body bytes"));
        assert_ne!(head.to_string(), body.to_string());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(BridgeError::ReadFailure { expected: 18, read: 4 }.is_fatal());
        assert!(BridgeError::ConnectionClosed.is_fatal());
        assert!(!BridgeError::UnsupportedOperation(Operation::new(9)).is_fatal());
        assert!(!BridgeError::InvalidRegistration("x".into()).is_fatal());
    }

    #[test]
    fn test_disconnect_only_for_clean_boundary() {
        assert!(BridgeError::ReadFailure { expected: 18, read: 0 }.is_disconnect());
        assert!(!BridgeError::ReadFailure { expected: 18, read: 7 }.is_disconnect());
        // metadata read that got nothing is a truncated frame, not a hang-up
        assert!(!BridgeError::ReadFailure { expected: 40, read: 0 }.is_disconnect());
    }
}
