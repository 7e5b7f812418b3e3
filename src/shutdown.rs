//! Shutdown coordination.
//!
//! A broadcast channel shared by every long-running task: the accept loop,
//! each live connection, and the rate-guard ticker all subscribe; one
//! trigger fans out to all of them. A connection blocked in a read is
//! released by its own deadline, so shutdown latency is bounded by one
//! timeout period.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Idempotent; subscribers that already
    /// exited are fine.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
