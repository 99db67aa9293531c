//! Codec module - serialization of the metadata block.
//!
//! The engine treats metadata as opaque bytes; these codecs turn caller
//! values into those bytes and back:
//!
//! - [`JsonCodec`] - structured text via `serde_json` (default, what existing
//!   tracker and storage nodes expect)
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`)
//!
//! # Design
//!
//! Codecs are marker structs with static methods. The codec is chosen
//! through a type parameter, e.g. `EnvelopeBuilder::<MsgPackCodec>`.
//!
//! # Example
//!
//! ```
//! use tracker_bridge::codec::{JsonCodec, MetaCodec, MsgPackCodec};
//!
//! let encoded = JsonCodec::encode(&"hello").unwrap();
//! assert_eq!(encoded, b"\"hello\"");
//!
//! let encoded = MsgPackCodec::encode(&42u32).unwrap();
//! let decoded: u32 = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, 42);
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Serialization format for envelope metadata.
pub trait MetaCodec {
    /// Short name used in logs.
    const NAME: &'static str;

    /// Encode a value to metadata bytes.
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>>;

    /// Decode metadata bytes to a value.
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T>;
}
