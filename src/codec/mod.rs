//! Pluggable wire encoding.
//!
//! The core is agnostic to the byte format: anything that can marshal typed
//! values and delimit one [`Package`] per call is a drop-in codec. JSON is
//! the reference implementation; a TLV or protobuf-style codec would slot in
//! behind the same trait.

pub mod json;

pub use json::JsonCodec;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::protocol::Package;

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to marshal value")]
    Marshal(#[source] serde_json::Error),

    #[error("failed to unmarshal value")]
    Unmarshal(#[source] serde_json::Error),

    #[error("failed to extract package from stream data")]
    Frame(#[source] serde_json::Error),

    #[error("marshaled payload is not valid text")]
    Payload(#[source] std::string::FromUtf8Error),
}

/// Marshals and unmarshals typed values, and extracts raw framed packages
/// from bytes read off the stream.
pub trait Codec: Send + Sync {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;

    /// Extract exactly one framed [`Package`] from `data`. The caller hands
    /// in the bytes of a single read; payloads spanning multiple reads are
    /// out of scope.
    fn get_raw(&self, data: &[u8]) -> Result<Package, CodecError>;
}
