//! Protocol module - operation registry, header codec and frame reading.
//!
//! This module implements the wire format shared by tracker and storage nodes:
//! - 2-byte operation tags resolved through an [`OperationRegistry`]
//! - 18-byte header encoding/decoding
//! - Frame head reading that stops at the first body byte

mod frame;
mod header;
mod operation;

pub use frame::{build_frame_head, read_frame};
pub use header::{Header, HEADER_SIZE};
pub use operation::{Operation, OperationRegistry, Tag, TAG_SIZE};

pub(crate) use frame::{read_header, read_meta};
