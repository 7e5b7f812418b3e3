//! Wire message types.
//!
//! Every transmitted unit is exactly one [`Package`]: a string tag naming
//! the payload's logical type plus the type-specific encoded body. The tag
//! is what the dispatcher routes on; the payload stays opaque until the
//! matching handler decodes it.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// A typed wire message: advertises the tag it travels under.
///
/// Tags are declared explicitly rather than derived from type names at
/// runtime, so the wire contract survives renames.
pub trait Message {
    const TAG: &'static str;
}

/// The only framing unit on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct Package {
    pub tag: String,
    pub payload: Box<RawValue>,
}

/// Client request for a fresh challenge.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NonceReq {}

impl Message for NonceReq {
    const TAG: &'static str = "NonceReq";
}

/// Server-issued challenge: random bytes plus the number of trailing zero
/// bits required of `hash(nonce ++ solution)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceResp {
    pub nonce: Vec<u8>,
    pub difficulty: u32,
}

impl Message for NonceResp {
    const TAG: &'static str = "NonceResp";
}

/// Client's claimed solution for the previously issued challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataReq {
    pub nonce: Vec<u8>,
    pub difficulty: u32,
    pub cnonce: Vec<u8>,
}

impl Message for DataReq {
    const TAG: &'static str = "DataReq";
}

/// The protected payload, returned only after verification succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResp {
    pub payload: Vec<u8>,
}

impl Message for DataResp {
    const TAG: &'static str = "DataResp";
}

/// Terminal, human-readable failure notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResp {
    pub reason: String,
}

impl Message for ErrorResp {
    const TAG: &'static str = "ErrorResp";
}
