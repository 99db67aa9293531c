//! Fixed frame header encoding and decoding.
//!
//! Implements the 18-byte header format:
//! ```text
//! ┌──────────┬─────────────┬─────────────┐
//! │ Op tag   │ Meta length │ Body length │
//! │ 2 bytes  │ 8 bytes     │ 8 bytes     │
//! │          │ uint64 BE   │ uint64 BE   │
//! └──────────┴─────────────┴─────────────┘
//! ```
//!
//! The header is followed by `meta_length` metadata bytes and then
//! `body_length` body bytes.

use super::operation::{Operation, OperationRegistry, Tag, TAG_SIZE};
use crate::error::Result;

/// Header size in bytes (fixed, exactly 18).
pub const HEADER_SIZE: usize = TAG_SIZE + 8 + 8;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Resolved operation (`UNKNOWN` if the tag is not registered).
    pub operation: Operation,
    /// Tag exactly as it appeared on the wire.
    pub tag: Tag,
    /// Metadata length in bytes.
    pub meta_length: u64,
    /// Body length in bytes.
    pub body_length: u64,
}

impl Header {
    /// Create a header for an outbound frame.
    ///
    /// The tag is filled in by [`Header::encode`] from the registry.
    pub fn new(operation: Operation, meta_length: u64, body_length: u64) -> Self {
        Self {
            operation,
            tag: [0; TAG_SIZE],
            meta_length,
            body_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if the operation is not registered;
    /// no bytes are produced in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use tracker_bridge::protocol::{Header, Operation, OperationRegistry};
    ///
    /// let registry = OperationRegistry::standard();
    /// let bytes = Header::new(Operation::CONNECT, 5, 100).encode(&registry).unwrap();
    /// assert_eq!(bytes.len(), 18);
    /// assert_eq!(&bytes[..2], &[1, 1]);
    /// ```
    pub fn encode(&self, registry: &OperationRegistry) -> Result<[u8; HEADER_SIZE]> {
        let tag = registry.tag_of(self.operation)?;
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&tag);
        buf[2..10].copy_from_slice(&self.meta_length.to_be_bytes());
        buf[10..18].copy_from_slice(&self.body_length.to_be_bytes());
        Ok(buf)
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Never fails: an unregistered tag resolves to [`Operation::UNKNOWN`]
    /// and the caller decides what to do with it.
    ///
    /// # Example
    ///
    /// ```
    /// use tracker_bridge::protocol::{Header, Operation, OperationRegistry};
    ///
    /// let mut bytes = [0u8; 18];
    /// bytes[..2].copy_from_slice(&[1, 2]);
    /// bytes[9] = 7;
    /// let header = Header::decode(&bytes, &OperationRegistry::standard());
    /// assert_eq!(header.operation, Operation::RESPONSE);
    /// assert_eq!(header.meta_length, 7);
    /// assert_eq!(header.body_length, 0);
    /// ```
    pub fn decode(buf: &[u8; HEADER_SIZE], registry: &OperationRegistry) -> Self {
        let tag = [buf[0], buf[1]];
        let mut meta = [0u8; 8];
        meta.copy_from_slice(&buf[2..10]);
        let mut body = [0u8; 8];
        body.copy_from_slice(&buf[10..18]);

        Self {
            operation: registry.operation_of(tag),
            tag,
            meta_length: u64::from_be_bytes(meta),
            body_length: u64::from_be_bytes(body),
        }
    }

    /// Check if a body segment follows the metadata.
    #[inline]
    pub fn has_body(&self) -> bool {
        self.body_length > 0
    }

    /// Total frame size on the wire (header + metadata + body).
    #[inline]
    pub fn frame_size(&self) -> u128 {
        HEADER_SIZE as u128 + self.meta_length as u128 + self.body_length as u128
    }
}
