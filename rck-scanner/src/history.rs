//! In-memory scan history
//!
//! Keeps the last N terminal check-in attempts for the status display.
//! Oldest entries are overwritten once full. Nothing is persisted.

use crate::checkin::CheckinAttempt;
use ringbuf::{
    traits::{Consumer, Observer, RingBuffer},
    HeapRb,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Bounded history of finished attempts
pub struct ScanHistory {
    entries: Mutex<HeapRb<CheckinAttempt>>,
    capacity: usize,
}

impl std::fmt::Debug for ScanHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHistory")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl ScanHistory {
    /// Create a history holding at most `capacity` attempts (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(HeapRb::new(capacity)),
            capacity,
        }
    }

    /// Append a finished attempt, evicting the oldest when full
    pub async fn record(&self, attempt: CheckinAttempt) {
        debug!(
            "History: {:?} attempt {} ({})",
            attempt.outcome,
            attempt.id,
            attempt.sanitized_payload()
        );
        let mut entries = self.entries.lock().await;
        if let Some(evicted) = entries.push_overwrite(attempt) {
            debug!("History full, evicted attempt {}", evicted.id);
        }
    }

    /// Up to `limit` attempts, newest first
    pub async fn recent(&self, limit: usize) -> Vec<CheckinAttempt> {
        let entries = self.entries.lock().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.occupied_len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn clear(&self) {
        *self.entries.lock().await = HeapRb::new(self.capacity);
    }
}
