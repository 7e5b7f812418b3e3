//! Connection-rate estimation for adaptive difficulty.
//!
//! # Responsibilities
//! - Count connection arrivals with a single atomic add on the hot path
//! - Maintain a one-second-resolution sliding window via a background ticker
//! - Report "arrivals in roughly the last N seconds", updated sub-second
//!
//! # Design Decisions
//! - Readers never lock: the estimate is `windowed + current`, both atomics
//! - The ring of per-second counts has a single writer (the ticker task),
//!   so its mutex is never contended on the increment path
//! - The estimate is advisory: it may be off by up to one second's arrivals
//!   around a tick, which is fine for difficulty scaling

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

/// Sliding-window rate estimator shared by every connection.
pub struct RateGuard {
    /// Arrivals during the current (partial) second.
    current: AtomicI64,
    /// Rolled sum over the completed seconds of the window.
    windowed: AtomicI64,
    /// Per-second counts for the window's completed seconds.
    ring: Mutex<Ring>,
}

struct Ring {
    slots: Vec<i64>,
    next: usize,
}

impl RateGuard {
    /// Create a guard covering roughly `window` of history. The current
    /// second is always counted, so the ring holds `window - 1` completed
    /// seconds; a window of one second or less degenerates to reporting only
    /// the current second's count.
    pub fn new(window: Duration) -> Self {
        let completed_secs = (window.as_secs() as usize).saturating_sub(1);

        Self {
            current: AtomicI64::new(0),
            windowed: AtomicI64::new(0),
            ring: Mutex::new(Ring {
                slots: vec![0; completed_secs],
                next: 0,
            }),
        }
    }

    /// Record one arrival and return the up-to-date rate estimate.
    ///
    /// Safe under arbitrary concurrent callers; the only synchronization is
    /// one atomic add.
    pub fn inc_rate(&self) -> i64 {
        self.windowed.load(Ordering::Relaxed) + self.current.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Run the once-per-second window rollover until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The immediate first tick would snapshot an empty second.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => return,
                _ = ticker.tick() => self.roll(),
            }
        }
    }

    /// Snapshot the elapsed second into the ring and rebalance the sum.
    fn roll(&self) {
        let last_second = self.current.swap(0, Ordering::Relaxed);

        let mut ring = self.ring.lock().expect("rate guard ring poisoned");
        if ring.slots.is_empty() {
            return;
        }

        let idx = ring.next;
        let evicted = ring.slots[idx];
        self.windowed.fetch_sub(evicted, Ordering::Relaxed);

        ring.slots[idx] = last_second;
        self.windowed.fetch_add(last_second, Ordering::Relaxed);
        ring.next = (idx + 1) % ring.slots.len();
    }
}
