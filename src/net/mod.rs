//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → server.rs (accept loop, one task per connection)
//!     → pool.rs (acquire read buffer + session handler)
//!     → timeout_io.rs (deadline-armed reads/writes)
//!     → session::Session (protocol state machine)
//! ```
//!
//! # Design Decisions
//! - Pooled buffers and sessions bound allocation churn, not concurrency
//! - Each connection tracked for graceful shutdown (wait-group drain)
//! - A connection's panic is isolated; the acceptor never sees it

pub mod pool;
pub mod server;
pub mod timeout_io;

pub use server::Server;
