//! Connection server: accept loop, per-connection protocol loop, pooling,
//! graceful drain.
//!
//! # Responsibilities
//! - One lightweight task per accepted connection
//! - Pooled read buffers and session handlers, acquired per connection and
//!   released on teardown
//! - Shutdown propagation and wait-group drain: `run` returns only after
//!   every spawned connection task has finished
//! - Panic isolation: a fault in one connection never reaches the acceptor
//!
//! # Design Decisions
//! - No hard connection cap: difficulty scaling via the rate guard is the
//!   congestion control. A semaphore in front of `accept` is the extension
//!   point if a cap is ever wanted.
//! - One task per connection relies on the runtime's scheduler; a worker
//!   pool would be the next step if task churn ever shows up in profiles.
//! - A connection blocked in a read unblocks via its own deadline, so
//!   shutdown latency is bounded by one timeout period.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::Error;
use crate::guard::RateGuard;
use crate::net::pool::Pool;
use crate::net::timeout_io::{read_chunk, write_frame, ReadOutcome};
use crate::quotes::QuoteSource;
use crate::session::{encode_error_resp, Session};
use crate::shutdown::Shutdown;

/// TCP front end driving one [`Session`] per connection.
pub struct Server {
    timeout: Duration,
    buffers: Arc<Pool<Vec<u8>>>,
    sessions: Arc<Pool<Session>>,
}

impl Server {
    pub fn new(cfg: &Config, guard: Arc<RateGuard>, quotes: Arc<dyn QuoteSource>) -> Self {
        let buff_size = cfg.net.buff_size;
        let pow_cfg = cfg.pow.clone();

        Self {
            timeout: cfg.net.timeout(),
            buffers: Arc::new(Pool::new(move || vec![0u8; buff_size])),
            sessions: Arc::new(Pool::new(move || {
                Session::new(&pow_cfg, Arc::clone(&guard), Arc::clone(&quotes))
            })),
        }
    }

    /// Accept connections until shutdown, then drain every live connection
    /// task before returning.
    pub async fn run(&self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), Error> {
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "listening for connections");

        let mut accept_shutdown = shutdown.subscribe();
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = accept_shutdown.recv() => break,

                // Reap finished tasks as we go so completed handles do not
                // pile up under long uptimes.
                Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                    log_task_exit(finished);
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let conn = ConnectionCtx {
                            timeout: self.timeout,
                            buffers: Arc::clone(&self.buffers),
                            sessions: Arc::clone(&self.sessions),
                        };
                        tasks.spawn(conn.serve(stream, addr, shutdown.subscribe()));
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "failed to accept connection");
                    }
                },
            }
        }

        // Stop accepting before the drain.
        drop(listener);

        tracing::info!(active = tasks.len(), "draining connections");
        while let Some(finished) = tasks.join_next().await {
            log_task_exit(finished);
        }

        Ok(())
    }
}

fn log_task_exit(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            // The JoinError carries the panic payload; the fault stays
            // confined to the connection that hit it.
            tracing::error!(error = %err, "connection task panicked");
        }
    }
}

/// Everything one connection task needs, cloned out of the server so the
/// task owns its handles outright.
struct ConnectionCtx {
    timeout: Duration,
    buffers: Arc<Pool<Vec<u8>>>,
    sessions: Arc<Pool<Session>>,
}

impl ConnectionCtx {
    async fn serve(
        self,
        mut stream: TcpStream,
        addr: SocketAddr,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut buf = self.buffers.acquire();
        let mut session = self.sessions.acquire();
        let mut out = Vec::new();

        tracing::info!(peer_addr = %addr, "client connected");

        loop {
            if shutdown_signalled(&mut shutdown) {
                break;
            }

            match read_chunk(&mut stream, &mut buf, self.timeout).await {
                Ok(ReadOutcome::TimedOut) => continue,
                Ok(ReadOutcome::Closed) => break,
                Ok(ReadOutcome::Data(n)) => {
                    out.clear();

                    match session.handle(&buf[..n], &mut out) {
                        Ok(()) => {
                            if !out.is_empty() {
                                if let Err(err) =
                                    write_frame(&mut stream, &out, self.timeout).await
                                {
                                    tracing::debug!(peer_addr = %addr, error = %err, "write failed");
                                    break;
                                }
                            }
                        }
                        Err(err) => {
                            tracing::debug!(peer_addr = %addr, error = %err, "session error, closing connection");
                            self.send_error_notice(&mut stream, &mut out, &err).await;
                            break;
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(peer_addr = %addr, error = %err, "read failed");
                    break;
                }
            }
        }

        session.reset();
        self.sessions.release(session);
        self.buffers.release(buf);

        tracing::info!(peer_addr = %addr, "client disconnected");
    }

    /// Best-effort `ErrorResp` before the connection closes. A failure to
    /// deliver it is logged and swallowed; the connection is going away
    /// either way.
    async fn send_error_notice(&self, stream: &mut TcpStream, out: &mut Vec<u8>, err: &Error) {
        if out.is_empty() {
            match encode_error_resp(&err.to_string()) {
                Ok(frame) => *out = frame,
                Err(enc_err) => {
                    tracing::debug!(error = %enc_err, "failed to encode error response");
                    return;
                }
            }
        }

        if let Err(write_err) = write_frame(stream, out, self.timeout).await {
            tracing::debug!(error = %write_err, "failed to send error response");
        }
    }
}

fn shutdown_signalled(rx: &mut broadcast::Receiver<()>) -> bool {
    !matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty))
}
