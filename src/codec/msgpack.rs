//! MsgPack codec using `rmp-serde`.
//!
//! Always uses `to_vec_named`: structs are written as maps keyed by field
//! name, so peers can add optional fields without breaking positional
//! decoding on the other side.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::MetaCodec;
use crate::error::Result;

/// MessagePack codec for compact binary metadata.
pub struct MsgPackCodec;

impl MetaCodec for MsgPackCodec {
    const NAME: &'static str = "msgpack";

    #[inline]
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    #[inline]
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct FileMeta {
        group: String,
        path: String,
        size: u64,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = FileMeta {
            group: "G01".to_string(),
            path: "/M00/0a/3f/abc".to_string(),
            size: 50 * 1024 * 1024,
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: FileMeta = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_struct_encoded_as_map() {
        let meta = FileMeta {
            group: "G".to_string(),
            path: "p".to_string(),
            size: 1,
        };

        let encoded = MsgPackCodec::encode(&meta).unwrap();

        // fixmap with 3 entries; an array would be 0x93
        assert_eq!(encoded[0], 0x83);
    }

    #[test]
    fn test_encode_decode_option() {
        let none_val: Option<i32> = None;
        let encoded = MsgPackCodec::encode(&none_val).unwrap();
        assert_eq!(encoded, vec![0xc0]);

        let decoded: Option<i32> = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<FileMeta> = MsgPackCodec::decode(b"not valid msgpack");
        assert!(matches!(result, Err(BridgeError::MsgPackDecode(_))));
    }
}
