//! Tag-dispatched message routing.
//!
//! # Responsibilities
//! - Map an untyped, tagged wire frame onto a statically-registered handler
//! - Type-safe payload decode before the handler's business function runs
//! - Single framing point for outbound messages
//!
//! # Design Decisions
//! - Registration is explicit and validated at startup; a duplicate tag is a
//!   programming error and panics, never a runtime data error
//! - Handlers write responses into an output buffer instead of a socket; the
//!   connection loop owns all transport I/O and its deadlines
//! - Adding a message kind is one registration line plus a handler closure

use std::collections::HashMap;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::Error;
use crate::protocol::{Message, Package};

/// A handler for one message tag.
pub trait Handler<C: Codec>: Send {
    fn tag(&self) -> &'static str;

    /// Decode `payload` and run the business function, appending any
    /// response frame to `out`.
    fn handle(&self, codec: &C, payload: &[u8], out: &mut Vec<u8>) -> Result<(), Error>;
}

/// Adapts a typed closure into a [`Handler`], performing the payload decode.
pub struct Processor<T, F> {
    func: F,
    _msg: PhantomData<fn(T)>,
}

impl<T, F> Processor<T, F> {
    pub fn new(func: F) -> Self {
        Self {
            func,
            _msg: PhantomData,
        }
    }
}

impl<C, T, F> Handler<C> for Processor<T, F>
where
    C: Codec,
    T: Message + DeserializeOwned,
    F: Fn(T, &mut Vec<u8>) -> Result<(), Error> + Send,
{
    fn tag(&self) -> &'static str {
        T::TAG
    }

    fn handle(&self, codec: &C, payload: &[u8], out: &mut Vec<u8>) -> Result<(), Error> {
        let msg: T = codec.unmarshal(payload).map_err(|source| Error::Decode {
            tag: T::TAG,
            source,
        })?;

        // Handler errors pass through unchanged so callers can match on kind.
        (self.func)(msg, out)
    }
}

/// Routes framed packages to their registered handlers.
pub struct Dispatcher<C: Codec> {
    codec: C,
    handlers: HashMap<&'static str, Box<dyn Handler<C>>>,
}

impl<C: Codec> Dispatcher<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its advertised tag.
    ///
    /// # Panics
    /// Panics if the tag is already registered. Registration happens once at
    /// startup, so this surfaces miswiring immediately.
    pub fn register(&mut self, handler: Box<dyn Handler<C>>) {
        let tag = handler.tag();

        if self.handlers.insert(tag, handler).is_some() {
            panic!("handler for tag '{tag}' is already registered");
        }
    }

    /// Extract one package from `input`, route it, and let the handler
    /// append its response to `out`.
    pub fn dispatch(&self, input: &[u8], out: &mut Vec<u8>) -> Result<(), Error> {
        let pkg = self.codec.get_raw(input)?;

        let handler = self
            .handlers
            .get(pkg.tag.as_str())
            .ok_or_else(|| Error::UnknownType {
                tag: pkg.tag.clone(),
            })?;

        handler.handle(&self.codec, pkg.payload.get().as_bytes(), out)
    }
}

/// Wrap `value` in a [`Package`] under its registered tag and marshal the
/// envelope. Every outbound message goes through here, so requests and
/// responses share one wire shape.
pub fn encode_package<T, C>(value: &T, codec: &C) -> Result<Vec<u8>, Error>
where
    T: Message + Serialize,
    C: Codec,
{
    let payload = codec.marshal(value)?;
    let payload = String::from_utf8(payload).map_err(crate::codec::CodecError::Payload)?;
    let payload =
        serde_json::value::RawValue::from_string(payload).map_err(crate::codec::CodecError::Marshal)?;

    let pkg = Package {
        tag: T::TAG.to_string(),
        payload,
    };

    Ok(codec.marshal(&pkg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::pow::PowError;
    use crate::protocol::{NonceReq, NonceResp};

    fn nonce_req_frame() -> Vec<u8> {
        encode_package(&NonceReq {}, &JsonCodec).unwrap()
    }

    #[test]
    fn dispatch_routes_to_registered_handler() {
        let mut disp = Dispatcher::new(JsonCodec);
        disp.register(Box::new(Processor::new(|_req: NonceReq, out: &mut Vec<u8>| {
            out.extend_from_slice(b"handled");
            Ok(())
        })));

        let mut out = Vec::new();
        disp.dispatch(&nonce_req_frame(), &mut out).unwrap();
        assert_eq!(out, b"handled");
    }

    #[test]
    fn dispatch_fails_on_unknown_tag() {
        let disp = Dispatcher::new(JsonCodec);

        let mut out = Vec::new();
        let err = disp.dispatch(&nonce_req_frame(), &mut out).unwrap_err();
        assert!(matches!(err, Error::UnknownType { tag } if tag == "NonceReq"));
    }

    #[test]
    fn dispatch_surfaces_payload_decode_failure() {
        let mut disp = Dispatcher::new(JsonCodec);
        // NonceResp expects an object; the frame carries a bare number.
        disp.register(Box::new(Processor::new(
            |_resp: NonceResp, _out: &mut Vec<u8>| Ok(()),
        )));

        let frame = br#"{"tag":"NonceResp","payload":42}"#;
        let mut out = Vec::new();
        let err = disp.dispatch(frame, &mut out).unwrap_err();
        assert!(matches!(err, Error::Decode { tag: "NonceResp", .. }));
    }

    #[test]
    fn handler_errors_propagate_unchanged_in_kind() {
        let mut disp = Dispatcher::new(JsonCodec);
        disp.register(Box::new(Processor::new(
            |_req: NonceReq, _out: &mut Vec<u8>| Err(Error::Pow(PowError::UnableToGenerate)),
        )));

        let mut out = Vec::new();
        let err = disp.dispatch(&nonce_req_frame(), &mut out).unwrap_err();
        assert!(matches!(err, Error::Pow(PowError::UnableToGenerate)));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut disp = Dispatcher::new(JsonCodec);
        disp.register(Box::new(Processor::new(
            |_req: NonceReq, _out: &mut Vec<u8>| Ok(()),
        )));
        disp.register(Box::new(Processor::new(
            |_req: NonceReq, _out: &mut Vec<u8>| Ok(()),
        )));
    }

    #[test]
    fn dispatch_fails_on_malformed_frame() {
        let disp: Dispatcher<JsonCodec> = Dispatcher::new(JsonCodec);
        let mut out = Vec::new();
        assert!(matches!(
            disp.dispatch(b"garbage", &mut out),
            Err(Error::Codec(_))
        ));
    }
}
