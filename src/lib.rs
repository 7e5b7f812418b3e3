//! Wordgate: a TCP quote service guarded by adaptive proof of work.
//!
//! # Architecture Overview
//!
//! ```text
//!  Client                         ┌──────────────────────────────────────┐
//!  ──────── NonceReq ────────────▶│  net::Server                         │
//!                                 │    accept loop, pooled buffers and   │
//!  ◀─────── NonceResp ────────────│    sessions, graceful drain          │
//!    (nonce, difficulty)          │        │                             │
//!                                 │        ▼                             │
//!    ...solve via pow::resolve    │  session::Session                    │
//!                                 │    dispatch by tag, challenge state  │
//!  ──────── DataReq ─────────────▶│        │            │                │
//!    (nonce, difficulty, cnonce)  │        ▼            ▼                │
//!                                 │  guard::RateGuard   pow engine       │
//!  ◀─────── DataResp ─────────────│    arrival rate →   gen / verify     │
//!    (quote)                      │    difficulty                        │
//!                                 └──────────────────────────────────────┘
//! ```
//!
//! Flooding clients drive the rate guard up, which scales the number of
//! trailing zero bits each challenge demands, so abusive traffic pays
//! exponentially more compute while a lone client gets a trivial puzzle.

// Core subsystems
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod guard;
pub mod net;
pub mod pow;
pub mod protocol;
pub mod session;

// Collaborators and endpoints
pub mod client;
pub mod quotes;

// Cross-cutting concerns
pub mod error;
pub mod shutdown;

pub use config::Config;
pub use error::Error;
pub use net::Server;
pub use shutdown::Shutdown;
