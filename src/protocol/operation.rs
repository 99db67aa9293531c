//! Operation identifiers and their 2-byte wire tags.
//!
//! The registry maps each logical [`Operation`] to a fixed tag and back.
//! Both peers must carry identical registries; there is no version field on
//! the wire to negotiate differences.
//!
//! | Operation  | Tag      |
//! |------------|----------|
//! | `CONNECT`  | `{1, 1}` |
//! | `RESPONSE` | `{1, 2}` |
//!
//! # Example
//!
//! ```
//! use tracker_bridge::protocol::{Operation, OperationRegistry};
//!
//! let registry = OperationRegistry::standard();
//! assert_eq!(registry.tag_of(Operation::CONNECT).unwrap(), [1, 1]);
//! assert_eq!(registry.operation_of([1, 2]), Operation::RESPONSE);
//! assert_eq!(registry.operation_of([9, 9]), Operation::UNKNOWN);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::{BridgeError, Result};

/// Size of an operation tag on the wire.
pub const TAG_SIZE: usize = 2;

/// Wire encoding of an operation.
pub type Tag = [u8; TAG_SIZE];

/// Logical operation carried by a message.
///
/// Value 0 is reserved as the "unknown operation" sentinel produced when a
/// received tag matches no registered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Operation(u16);

impl Operation {
    /// Sentinel for tags with no registered operation.
    pub const UNKNOWN: Operation = Operation(0);
    /// Connection handshake from a storage node or client.
    pub const CONNECT: Operation = Operation(1);
    /// Generic response to a previous request.
    pub const RESPONSE: Operation = Operation(2);

    /// Create an operation from its numeric code.
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric code of this operation.
    #[inline]
    pub const fn code(self) -> u16 {
        self.0
    }

    /// True for the unknown-operation sentinel.
    #[inline]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => write!(f, "UNKNOWN"),
            Self::CONNECT => write!(f, "CONNECT"),
            Self::RESPONSE => write!(f, "RESPONSE"),
            Self(code) => write!(f, "OP({code})"),
        }
    }
}

static SHARED: LazyLock<Arc<OperationRegistry>> =
    LazyLock::new(|| Arc::new(OperationRegistry::standard()));

/// Bidirectional map between operations and wire tags.
///
/// Built once before any connection is served and shared read-only
/// afterwards, usually behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    /// Tag by operation (encode direction).
    tags: HashMap<Operation, Tag>,
    /// Operation by tag (decode direction).
    operations: HashMap<Tag, Operation>,
}

impl OperationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in operations (`CONNECT`, `RESPONSE`).
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert(Operation::CONNECT, [1, 1]);
        registry.insert(Operation::RESPONSE, [1, 2]);
        registry
    }

    /// Process-wide standard registry.
    pub fn shared() -> Arc<OperationRegistry> {
        Arc::clone(&SHARED)
    }

    /// Register an operation under a tag.
    ///
    /// # Errors
    ///
    /// Rejects the `UNKNOWN` sentinel, the all-zero tag, and any operation or
    /// tag that is already registered.
    pub fn register(mut self, operation: Operation, tag: Tag) -> Result<Self> {
        if operation.is_unknown() {
            return Err(BridgeError::InvalidRegistration(
                "operation 0 is reserved".to_string(),
            ));
        }
        if tag == [0, 0] {
            return Err(BridgeError::InvalidRegistration(
                "tag {0,0} is reserved".to_string(),
            ));
        }
        if self.tags.contains_key(&operation) {
            return Err(BridgeError::InvalidRegistration(format!(
                "{operation} is already registered"
            )));
        }
        if let Some(existing) = self.operations.get(&tag) {
            return Err(BridgeError::InvalidRegistration(format!(
                "tag {tag:?} is already used by {existing}"
            )));
        }
        self.insert(operation, tag);
        Ok(self)
    }

    fn insert(&mut self, operation: Operation, tag: Tag) {
        self.tags.insert(operation, tag);
        self.operations.insert(tag, operation);
    }

    /// Wire tag of an operation.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if the operation is not registered.
    pub fn tag_of(&self, operation: Operation) -> Result<Tag> {
        self.tags
            .get(&operation)
            .copied()
            .ok_or(BridgeError::UnsupportedOperation(operation))
    }

    /// Operation for a wire tag, or [`Operation::UNKNOWN`].
    pub fn operation_of(&self, tag: Tag) -> Operation {
        self.operations
            .get(&tag)
            .copied()
            .unwrap_or(Operation::UNKNOWN)
    }

    /// Check whether an operation is registered.
    pub fn contains(&self, operation: Operation) -> bool {
        self.tags.contains_key(&operation)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
