//! JSON codec using `serde_json`.
//!
//! Matches the structured-text metadata already exchanged between tracker and
//! storage nodes, so it is the default for envelopes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::MetaCodec;
use crate::error::Result;

/// JSON codec for metadata.
pub struct JsonCodec;

impl MetaCodec for JsonCodec {
    const NAME: &'static str = "json";

    #[inline]
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    #[inline]
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
