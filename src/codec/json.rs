//! JSON reference codec.
//!
//! Plain JSON keeps the wire human-inspectable; production deployments that
//! care about byte overhead would swap in a binary codec behind the same
//! trait.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Codec, CodecError};
use crate::protocol::Package;

/// Stateless JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::Marshal)
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Unmarshal)
    }

    fn get_raw(&self, data: &[u8]) -> Result<Package, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, NonceResp};

    #[test]
    fn marshal_unmarshal_round_trip() {
        let codec = JsonCodec;
        let resp = NonceResp {
            nonce: vec![1, 2, 3],
            difficulty: 4,
        };

        let bytes = codec.marshal(&resp).unwrap();
        let back: NonceResp = codec.unmarshal(&bytes).unwrap();

        assert_eq!(back.nonce, resp.nonce);
        assert_eq!(back.difficulty, resp.difficulty);
    }

    #[test]
    fn get_raw_extracts_tag_and_opaque_payload() {
        let codec = JsonCodec;
        let frame = br#"{"tag":"NonceReq","payload":{}}"#;

        let pkg = codec.get_raw(frame).unwrap();
        assert_eq!(pkg.tag, crate::protocol::NonceReq::TAG);
        assert_eq!(pkg.payload.get(), "{}");
    }

    #[test]
    fn get_raw_rejects_malformed_frames() {
        let codec = JsonCodec;
        assert!(matches!(
            codec.get_raw(b"not json"),
            Err(CodecError::Frame(_))
        ));
    }
}
