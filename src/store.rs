//! Bounded, shared store of recently received messages.
//!
//! Every connection feeds the same [`MessageStore`]; an external dashboard
//! polls [`MessageStore::stats`] for a read-only view. The store keeps a
//! running total, the time of the last arrival, and the text of the five
//! most recent messages.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};

/// Number of recent messages retained; older entries are evicted FIFO.
pub const RECENT_CAPACITY: usize = 5;

/// Point-in-time snapshot of the store.
///
/// `total`, `last_received`, and `recent` all reflect the same instant; the
/// snapshot is a value copy, never a live view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Messages accepted since startup.
    pub total: u64,
    /// Arrival time of the most recent message.
    pub last_received: Option<DateTime<Utc>>,
    /// Text of the most recent messages, oldest first.
    pub recent: Vec<String>,
}

#[derive(Debug, Default)]
struct StoreInner {
    total: u64,
    last_received: Option<DateTime<Utc>>,
    recent: VecDeque<String>,
}

/// Thread-safe message counter and recent-message ring buffer.
///
/// All mutation goes through a single exclusive lock; reads take the same
/// lock so a snapshot is always internally consistent.
#[derive(Debug, Default)]
pub struct MessageStore {
    inner: Mutex<StoreInner>,
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Record an accepted message.
    pub fn add_message(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.total += 1;
        inner.last_received = Some(Utc::now());
        inner.recent.push_back(text.to_owned());
        while inner.recent.len() > RECENT_CAPACITY {
            inner.recent.pop_front();
        }
    }

    /// Take a consistent snapshot of the store.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        StoreStats {
            total: inner.total,
            last_received: inner.last_received,
            recent: inner.recent.iter().cloned().collect(),
        }
    }
}
