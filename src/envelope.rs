//! Envelope - one request or response message.
//!
//! An envelope carries the operation, the serialized metadata block and the
//! declared body length. The body itself never lives in the envelope; it is
//! streamed through [`BodyWriter`](crate::handler::BodyWriter) and
//! [`BodyHandler`](crate::handler::BodyHandler) callbacks.
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use tracker_bridge::{Envelope, Operation};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Connect {
//!     uuid: String,
//! }
//!
//! let meta = Connect { uuid: "node-1".into() };
//! let envelope = Envelope::build(Operation::CONNECT, &meta, 0).unwrap();
//! assert_eq!(envelope.meta_length(), envelope.meta_body().len() as u64);
//!
//! let decoded: Connect = envelope.decode_meta().unwrap();
//! assert_eq!(decoded, meta);
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{JsonCodec, MetaCodec};
use crate::error::{BridgeError, Result};
use crate::protocol::{Header, Operation, OperationRegistry};

/// A single message: operation, metadata and declared body length.
///
/// `meta_length` is always derived from the metadata bytes and cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    operation: Operation,
    body_length: u64,
    meta_body: Bytes,
}

impl Envelope {
    /// Build an envelope with JSON metadata against the shared registry.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` if `operation` is not registered.
    /// - `Json` if the metadata cannot be serialized.
    pub fn build<T: Serialize + ?Sized>(
        operation: Operation,
        meta: &T,
        body_length: u64,
    ) -> Result<Self> {
        EnvelopeBuilder::<JsonCodec>::new().build(operation, meta, body_length)
    }

    /// Assemble an envelope from a received frame head.
    pub(crate) fn from_frame(header: &Header, meta_body: Bytes) -> Self {
        debug_assert_eq!(header.meta_length, meta_body.len() as u64);
        Self {
            operation: header.operation,
            body_length: header.body_length,
            meta_body,
        }
    }

    /// The operation of this message.
    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Length of the serialized metadata block.
    #[inline]
    pub fn meta_length(&self) -> u64 {
        self.meta_body.len() as u64
    }

    /// Declared length of the body segment.
    #[inline]
    pub fn body_length(&self) -> u64 {
        self.body_length
    }

    /// Serialized metadata bytes.
    #[inline]
    pub fn meta_body(&self) -> &Bytes {
        &self.meta_body
    }

    /// Check if a body segment follows the metadata.
    #[inline]
    pub fn has_body(&self) -> bool {
        self.body_length > 0
    }

    /// Header describing this envelope on the wire.
    pub fn header(&self) -> Header {
        Header::new(self.operation, self.meta_length(), self.body_length)
    }

    /// Decode the metadata as JSON.
    pub fn decode_meta<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode_meta_with::<JsonCodec, T>()
    }

    /// Decode the metadata with a specific codec.
    pub fn decode_meta_with<C: MetaCodec, T: DeserializeOwned>(&self) -> Result<T> {
        C::decode(&self.meta_body)
    }
}

/// Builds validated envelopes with a chosen metadata codec.
///
/// # Example
///
/// ```
/// use tracker_bridge::codec::MsgPackCodec;
/// use tracker_bridge::{EnvelopeBuilder, Operation};
///
/// let builder = EnvelopeBuilder::<MsgPackCodec>::new();
/// let envelope = builder.build(Operation::RESPONSE, &(0u8, "ok"), 1024).unwrap();
/// assert_eq!(envelope.body_length(), 1024);
/// ```
pub struct EnvelopeBuilder<C: MetaCodec = JsonCodec> {
    registry: Arc<OperationRegistry>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: MetaCodec> EnvelopeBuilder<C> {
    /// Builder validating against the shared registry.
    pub fn new() -> Self {
        Self::with_registry(OperationRegistry::shared())
    }

    /// Builder validating against a custom registry.
    pub fn with_registry(registry: Arc<OperationRegistry>) -> Self {
        Self {
            registry,
            _codec: PhantomData,
        }
    }

    /// Build an envelope.
    ///
    /// The operation is checked before anything is serialized. `body_length`
    /// is copied as given; matching it with the bytes actually sent is the
    /// caller's contract with the peer.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` if `operation` is not registered.
    /// - A codec error if the metadata cannot be serialized.
    pub fn build<T: Serialize + ?Sized>(
        &self,
        operation: Operation,
        meta: &T,
        body_length: u64,
    ) -> Result<Envelope> {
        if !self.registry.contains(operation) {
            return Err(BridgeError::UnsupportedOperation(operation));
        }

        let meta_body = C::encode(meta)?;
        tracing::trace!(
            "built {} envelope: {} meta bytes ({}), body {}",
            operation,
            meta_body.len(),
            C::NAME,
            body_length
        );

        Ok(Envelope {
            operation,
            body_length,
            meta_body: Bytes::from(meta_body),
        })
    }

    /// Build an envelope whose metadata is already serialized.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if `operation` is not registered.
    pub fn build_raw(
        &self,
        operation: Operation,
        meta_body: Bytes,
        body_length: u64,
    ) -> Result<Envelope> {
        if !self.registry.contains(operation) {
            return Err(BridgeError::UnsupportedOperation(operation));
        }

        Ok(Envelope {
            operation,
            body_length,
            meta_body,
        })
    }
}

impl<C: MetaCodec> Default for EnvelopeBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MetaCodec> Clone for EnvelopeBuilder<C> {
    fn clone(&self) -> Self {
        Self::with_registry(Arc::clone(&self.registry))
    }
}
