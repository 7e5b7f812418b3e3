//! Requester-side flow: obtain a challenge, pay for it, collect the quote.
//!
//! One exchange is strictly sequential: `NonceReq` → `NonceResp` → solve →
//! `DataReq` → `DataResp`. The brute-force solve is CPU-bound, so it runs on
//! a blocking thread with the configured timeout as its cancellation budget.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;

use crate::codec::{Codec, JsonCodec};
use crate::dispatch::encode_package;
use crate::error::Error;
use crate::net::timeout_io::{read_chunk, write_frame, ReadOutcome};
use crate::pow;
use crate::protocol::{DataReq, DataResp, ErrorResp, Message, NonceReq, NonceResp, Package};

/// Client for the quote service.
pub struct Client {
    addr: String,
    timeout: Duration,
    buff_size: usize,
}

impl Client {
    pub fn new(addr: String, timeout: Duration, buff_size: usize) -> Self {
        Self {
            addr,
            timeout,
            buff_size,
        }
    }

    /// Run one full exchange and return the quote.
    pub async fn fetch_quote(&self) -> Result<String, Error> {
        let codec = JsonCodec;
        let mut stream = TcpStream::connect(&self.addr).await?;
        let mut buf = vec![0u8; self.buff_size];

        let frame = encode_package(&NonceReq {}, &codec)?;
        write_frame(&mut stream, &frame, self.timeout).await?;

        let challenge: NonceResp = self.read_message(&mut stream, &mut buf, &codec).await?;
        tracing::debug!(difficulty = challenge.difficulty, "challenge received");

        let started = Instant::now();
        let cnonce = self.solve(&challenge).await?;
        tracing::info!(
            difficulty = challenge.difficulty,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "challenge solution found"
        );

        let frame = encode_package(
            &DataReq {
                nonce: challenge.nonce,
                difficulty: challenge.difficulty,
                cnonce,
            },
            &codec,
        )?;
        write_frame(&mut stream, &frame, self.timeout).await?;

        let data: DataResp = self.read_message(&mut stream, &mut buf, &codec).await?;

        String::from_utf8(data.payload)
            .map_err(|_| Error::Peer {
                reason: "payload is not valid UTF-8".to_string(),
            })
    }

    /// Brute-force the solution on a blocking thread; a watchdog task turns
    /// the cancel flag after the solve budget expires.
    async fn solve(&self, challenge: &NonceResp) -> Result<Vec<u8>, Error> {
        let cancel = Arc::new(AtomicBool::new(false));

        let watchdog = tokio::spawn({
            let cancel = Arc::clone(&cancel);
            let budget = self.timeout;
            async move {
                tokio::time::sleep(budget).await;
                cancel.store(true, Ordering::Relaxed);
            }
        });

        let result = tokio::task::spawn_blocking({
            let nonce = challenge.nonce.clone();
            let difficulty = challenge.difficulty;
            let cancel = Arc::clone(&cancel);
            move || pow::resolve(&nonce, difficulty, &cancel)
        })
        .await
        .map_err(|join_err| Error::Io(io::Error::other(join_err)))?;

        watchdog.abort();

        Ok(result?)
    }

    /// Read one package and decode it as `T`; an `ErrorResp` in its place
    /// surfaces as [`Error::Peer`].
    async fn read_message<T>(
        &self,
        stream: &mut TcpStream,
        buf: &mut [u8],
        codec: &JsonCodec,
    ) -> Result<T, Error>
    where
        T: Message + serde::de::DeserializeOwned,
    {
        let n = match read_chunk(stream, buf, self.timeout).await? {
            ReadOutcome::Data(n) => n,
            ReadOutcome::TimedOut => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no response before the deadline",
                )))
            }
            ReadOutcome::Closed => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )))
            }
        };

        let pkg: Package = codec.get_raw(&buf[..n])?;

        if pkg.tag == ErrorResp::TAG {
            let err: ErrorResp = codec.unmarshal(pkg.payload.get().as_bytes())?;
            return Err(Error::Peer { reason: err.reason });
        }

        if pkg.tag != T::TAG {
            return Err(Error::UnknownType { tag: pkg.tag });
        }

        Ok(codec.unmarshal(pkg.payload.get().as_bytes())?)
    }
}
