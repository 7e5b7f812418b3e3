//! Per-connection challenge/response flow.
//!
//! # State machine
//! ```text
//! NonceReq  → inc rate → scale difficulty → issue challenge → NonceResp
//! DataReq   → verify against the *stored* challenge
//!               ok  → quote → DataResp, state reset
//!               bad → ErrorResp("Bad challenge solution"), stay connected
//! ```
//!
//! A session belongs to exactly one connection at a time; it is pooled and
//! reset between connections. The issued challenge is single-use: it is
//! consumed by the first DataReq that arrives, successful or not, so a
//! solution can never be replayed.

use std::sync::{Arc, Mutex};

use crate::codec::JsonCodec;
use crate::config::schema::PowConfig;
use crate::dispatch::{encode_package, Dispatcher, Processor};
use crate::error::Error;
use crate::guard::RateGuard;
use crate::pow;
use crate::protocol::{DataReq, DataResp, ErrorResp, NonceReq, NonceResp};
use crate::quotes::QuoteSource;

/// Reply sent for a well-formed but wrong proof solution.
const BAD_SOLUTION: &str = "Bad challenge solution";

struct SessionState {
    challenge: Option<Vec<u8>>,
    difficulty: u32,
}

/// One connection's protocol logic: a dispatcher wired to handlers that
/// share the outstanding challenge state.
pub struct Session {
    dispatcher: Dispatcher<JsonCodec>,
    state: Arc<Mutex<SessionState>>,
    max_difficulty: u32,
}

impl Session {
    pub fn new(cfg: &PowConfig, guard: Arc<RateGuard>, quotes: Arc<dyn QuoteSource>) -> Self {
        let state = Arc::new(Mutex::new(SessionState {
            challenge: None,
            difficulty: cfg.max_difficulty,
        }));

        let mut dispatcher = Dispatcher::new(JsonCodec);

        dispatcher.register(Box::new(Processor::new({
            let state = Arc::clone(&state);
            let challenge_len = cfg.challenge_len;
            let max_difficulty = cfg.max_difficulty;
            let factor = cfg.rate_difficulty_factor;

            move |_req: NonceReq, out: &mut Vec<u8>| {
                on_nonce_req(&state, &guard, challenge_len, max_difficulty, factor, out)
            }
        })));

        dispatcher.register(Box::new(Processor::new({
            let state = Arc::clone(&state);
            let max_difficulty = cfg.max_difficulty;

            move |req: DataReq, out: &mut Vec<u8>| {
                on_data_req(&state, quotes.as_ref(), max_difficulty, req, out)
            }
        })));

        Self {
            dispatcher,
            state,
            max_difficulty: cfg.max_difficulty,
        }
    }

    /// Entry point for one chunk read off the connection: exactly one framed
    /// package in, at most one response frame appended to `out`.
    pub fn handle(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), Error> {
        self.dispatcher.dispatch(input, out)
    }

    /// Return the session to its initial state before it goes back to the
    /// pool.
    pub fn reset(&mut self) {
        let mut state = self.state.lock().expect("session state poisoned");
        state.challenge = None;
        state.difficulty = self.max_difficulty;
    }
}

fn on_nonce_req(
    state: &Mutex<SessionState>,
    guard: &RateGuard,
    challenge_len: usize,
    max_difficulty: u32,
    factor: f64,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    let rate = guard.inc_rate();
    let difficulty = scale_difficulty(rate, factor, max_difficulty);

    let nonce = match pow::gen_challenge(challenge_len, difficulty) {
        Ok(nonce) => nonce,
        Err(err) => {
            tracing::error!(rate, difficulty, error = %err, "failed to generate challenge");
            write_error_resp(out, "Failed to generate challenge");
            return Err(err.into());
        }
    };

    {
        let mut state = state.lock().expect("session state poisoned");
        state.challenge = Some(nonce.clone());
        state.difficulty = difficulty;
    }

    tracing::debug!(rate, difficulty, "challenge issued");
    out.extend(encode_package(&NonceResp { nonce, difficulty }, &JsonCodec)?);

    Ok(())
}

fn on_data_req(
    state: &Mutex<SessionState>,
    quotes: &dyn QuoteSource,
    max_difficulty: u32,
    req: DataReq,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    // Take the challenge so the issued pair is invalidated no matter how
    // verification goes. Difficulty always comes from session state, never
    // from the client's copy.
    let (challenge, difficulty) = {
        let mut state = state.lock().expect("session state poisoned");
        (state.challenge.take(), state.difficulty)
    };

    let Some(challenge) = challenge else {
        write_error_resp(out, "No outstanding challenge");
        return Ok(());
    };

    let verified = req.nonce == challenge && pow::check_solution(&challenge, &req.cnonce, difficulty)?;

    if !verified {
        tracing::debug!(difficulty, "bad challenge solution");
        write_error_resp(out, BAD_SOLUTION);
        return Ok(());
    }

    let quote = match quotes.get_quote() {
        Ok(quote) => quote,
        Err(err) => {
            write_error_resp(out, "Internal error");
            return Err(err.into());
        }
    };

    {
        let mut state = state.lock().expect("session state poisoned");
        state.difficulty = max_difficulty;
    }

    out.extend(encode_package(
        &DataResp {
            payload: quote.into_bytes(),
        },
        &JsonCodec,
    )?);

    Ok(())
}

/// `min(max, floor(rate * factor))`, clamped to at least one bit: a
/// zero-bit challenge would be free.
fn scale_difficulty(rate: i64, factor: f64, max_difficulty: u32) -> u32 {
    let scaled = (rate.max(0) as f64 * factor).floor();

    if scaled >= f64::from(max_difficulty) {
        max_difficulty
    } else if scaled < 1.0 {
        1
    } else {
        scaled as u32
    }
}

/// Best-effort `ErrorResp`; an encode failure here is swallowed because the
/// caller is already on an error path.
fn write_error_resp(out: &mut Vec<u8>, reason: &str) {
    match encode_package(
        &ErrorResp {
            reason: reason.to_string(),
        },
        &JsonCodec,
    ) {
        Ok(frame) => out.extend(frame),
        Err(err) => tracing::debug!(error = %err, "failed to encode error response"),
    }
}

/// Encode a standalone `ErrorResp` frame; used by the connection loop when a
/// dispatch error leaves no response in the buffer.
pub fn encode_error_resp(reason: &str) -> Result<Vec<u8>, Error> {
    encode_package(
        &ErrorResp {
            reason: reason.to_string(),
        },
        &JsonCodec,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use crate::codec::Codec;
    use crate::protocol::{Message, Package};
    use crate::quotes::StaticQuotes;

    fn test_session(max_difficulty: u32, factor: f64) -> Session {
        let cfg = PowConfig {
            challenge_len: 32,
            max_difficulty,
            rate_difficulty_factor: factor,
            guard_window_secs: 3,
        };
        let guard = Arc::new(RateGuard::new(Duration::from_secs(3)));
        let quotes: Arc<dyn QuoteSource> = Arc::new(StaticQuotes::default());

        Session::new(&cfg, guard, quotes)
    }

    fn roundtrip<Req, Resp>(session: &mut Session, req: &Req) -> Resp
    where
        Req: Message + serde::Serialize,
        Resp: Message + serde::de::DeserializeOwned,
    {
        let frame = encode_package(req, &JsonCodec).unwrap();
        let mut out = Vec::new();
        session.handle(&frame, &mut out).unwrap();

        let pkg: Package = JsonCodec.get_raw(&out).unwrap();
        assert_eq!(pkg.tag, Resp::TAG);
        JsonCodec.unmarshal(pkg.payload.get().as_bytes()).unwrap()
    }

    #[test]
    fn nonce_req_issues_scaled_challenge() {
        // Guard rate is 1 for the first request; factor 1.0 → difficulty 1.
        let mut session = test_session(5, 1.0);
        let resp: NonceResp = roundtrip::<_, NonceResp>(&mut session, &NonceReq {});

        assert_eq!(resp.nonce.len(), 32);
        assert_eq!(resp.difficulty, 1);
    }

    #[test]
    fn solved_challenge_yields_quote() {
        let mut session = test_session(5, 1.0);
        let challenge: NonceResp = roundtrip::<_, NonceResp>(&mut session, &NonceReq {});

        let cancel = AtomicBool::new(false);
        let cnonce = pow::resolve(&challenge.nonce, challenge.difficulty, &cancel).unwrap();

        let data: DataResp = roundtrip::<_, DataResp>(
            &mut session,
            &DataReq {
                nonce: challenge.nonce,
                difficulty: challenge.difficulty,
                cnonce,
            },
        );
        assert!(!data.payload.is_empty());
    }

    #[test]
    fn bad_solution_keeps_connection_alive() {
        let mut session = test_session(5, 1.0);
        let challenge: NonceResp = roundtrip::<_, NonceResp>(&mut session, &NonceReq {});

        // At difficulty 1 an arbitrary cnonce is accidentally valid half the
        // time; extend it until it verifiably fails the check.
        let mut cnonce = b"wrong".to_vec();
        while pow::check_solution(&challenge.nonce, &cnonce, challenge.difficulty).unwrap() {
            cnonce.push(b'!');
        }

        // handle() returning Ok means the connection loop keeps reading.
        let err: ErrorResp = roundtrip::<_, ErrorResp>(
            &mut session,
            &DataReq {
                nonce: challenge.nonce,
                difficulty: challenge.difficulty,
                cnonce,
            },
        );
        assert_eq!(err.reason, BAD_SOLUTION);

        // The session still serves a fresh challenge afterwards.
        let again: NonceResp = roundtrip::<_, NonceResp>(&mut session, &NonceReq {});
        assert_eq!(again.nonce.len(), 32);
    }

    #[test]
    fn consumed_challenge_cannot_be_replayed() {
        let mut session = test_session(5, 1.0);
        let challenge: NonceResp = roundtrip::<_, NonceResp>(&mut session, &NonceReq {});

        let cancel = AtomicBool::new(false);
        let cnonce = pow::resolve(&challenge.nonce, challenge.difficulty, &cancel).unwrap();
        let req = DataReq {
            nonce: challenge.nonce,
            difficulty: challenge.difficulty,
            cnonce,
        };

        let _: DataResp = roundtrip::<_, DataResp>(&mut session, &req);

        // Same valid solution again: the stored pair is gone.
        let err: ErrorResp = roundtrip::<_, ErrorResp>(&mut session, &req);
        assert_eq!(err.reason, "No outstanding challenge");
    }

    #[test]
    fn data_req_without_challenge_is_rejected() {
        let mut session = test_session(5, 1.0);

        let err: ErrorResp = roundtrip::<_, ErrorResp>(
            &mut session,
            &DataReq {
                nonce: vec![1],
                difficulty: 1,
                cnonce: vec![2],
            },
        );
        assert_eq!(err.reason, "No outstanding challenge");
    }

    #[test]
    fn difficulty_scaling_clamps_to_bounds() {
        assert_eq!(scale_difficulty(1, 1.0, 5), 1);
        assert_eq!(scale_difficulty(3, 2.0, 5), 5);
        assert_eq!(scale_difficulty(1, 0.25, 5), 1);
        assert_eq!(scale_difficulty(0, 1.0, 5), 1);
        assert_eq!(scale_difficulty(4, 1.0, 5), 4);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut session = test_session(5, 1.0);
        let _: NonceResp = roundtrip::<_, NonceResp>(&mut session, &NonceReq {});

        session.reset();

        let err: ErrorResp = roundtrip::<_, ErrorResp>(
            &mut session,
            &DataReq {
                nonce: vec![0; 32],
                difficulty: 1,
                cnonce: vec![],
            },
        );
        assert_eq!(err.reason, "No outstanding challenge");
    }
}
