//! Reusable object pool.
//!
//! # Responsibilities
//! - Bound allocation churn under sustained connection load
//! - Hand out exclusively-owned items; nothing is aliased across users
//!
//! # Design Decisions
//! - Explicit acquire/release, no finalizer-driven return
//! - Unbounded free list: true concurrency is capped elsewhere (or not at
//!   all), so the pool only smooths allocation, it does not gatekeep

use std::sync::Mutex;

/// A free-list pool with a factory for first-use construction.
pub struct Pool<T> {
    items: Mutex<Vec<T>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> Pool<T> {
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            factory: Box::new(factory),
        }
    }

    /// Pop a pooled item, or build a fresh one if the list is empty.
    pub fn acquire(&self) -> T {
        let recycled = self.items.lock().expect("pool poisoned").pop();
        recycled.unwrap_or_else(|| (self.factory)())
    }

    /// Return an item for reuse. Callers reset item state first if the type
    /// carries any.
    pub fn release(&self, item: T) {
        self.items.lock().expect("pool poisoned").push(item);
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.items.lock().expect("pool poisoned").len()
    }
}
