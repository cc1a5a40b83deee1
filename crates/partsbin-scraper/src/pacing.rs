//! Minimum-interval pacing of outbound requests, keyed by domain or supplier.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Spaces consecutive calls sharing a key by at least a given interval.
///
/// Each caller reserves the next free slot for its key under the lock and
/// sleeps outside it, so concurrent callers queue up in arrival order and
/// callers with different keys never wait on each other.
#[derive(Debug, Default)]
pub struct Pacer {
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl Pacer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until a call for `key` is allowed, then records it.
    pub async fn wait(&self, key: &str, min_interval: Duration) {
        let wait = self.reserve(key, min_interval);
        if !wait.is_zero() {
            tracing::debug!(
                key,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "pacing outbound request"
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn reserve(&self, key: &str, min_interval: Duration) -> Duration {
        let now = Instant::now();
        let mut slots = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get(key).map_or(now, |next| (*next).max(now));
        slots.insert(key.to_owned(), slot + min_interval);
        slot.saturating_duration_since(now)
    }
}
