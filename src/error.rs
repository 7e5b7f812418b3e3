//! Crate-wide error type.
//!
//! Engine and dispatcher failures are wrapped with enough context (which
//! stage, which tag) to diagnose from logs alone. The connection loop closes
//! the connection on any error it receives; a failed-but-well-formed proof
//! solution is deliberately *not* an error at this level, so the peer can
//! request a fresh challenge on the same connection.

use thiserror::Error;

use crate::codec::CodecError;
use crate::pow::PowError;
use crate::quotes::QuoteError;

#[derive(Debug, Error)]
pub enum Error {
    /// A frame arrived carrying a tag no handler is registered for.
    #[error("unknown package type '{tag}'")]
    UnknownType { tag: String },

    /// A registered handler failed to decode its payload.
    #[error("failed to decode '{tag}' payload")]
    Decode {
        tag: &'static str,
        #[source]
        source: CodecError,
    },

    /// Encoding or frame extraction failed outside a handler.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Proof-of-work engine failure.
    #[error(transparent)]
    Pow(#[from] PowError),

    /// The quote source could not produce a payload.
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// The peer answered with an [`ErrorResp`](crate::protocol::ErrorResp).
    #[error("peer reported error: {reason}")]
    Peer { reason: String },

    /// Transport-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
