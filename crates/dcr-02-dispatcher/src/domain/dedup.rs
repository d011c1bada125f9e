//! # Redelivery Filter
//!
//! Remembers recently handled requests so a redelivered copy is dropped
//! instead of hitting the backend twice on this instance.
//!
//! - A request is keyed by its response topic and correlation data
//! - Keys are forgotten once the window has passed
//! - The table is bounded: when it fills up, expired keys are swept and,
//!   if that frees nothing, the oldest keys are evicted

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default maximum of remembered requests.
pub const MAX_DEDUP_ENTRIES: usize = 100_000;

/// Time-bounded set of recently seen requests.
#[derive(Debug)]
pub struct RecentRequestFilter {
    /// Map of request key -> expiry instant
    seen: Mutex<HashMap<(String, Vec<u8>), Instant>>,
    window: Duration,
    capacity: usize,
}

impl RecentRequestFilter {
    pub fn new(window: Duration) -> Self {
        Self::with_capacity(window, MAX_DEDUP_ENTRIES)
    }

    /// Filter remembering at most `capacity` requests.
    pub fn with_capacity(window: Duration, capacity: usize) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            window,
            capacity: capacity.max(1),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request; returns false if it was already seen within the
    /// window.
    pub fn check_and_insert(&self, response_topic: &str, correlation_data: &[u8]) -> bool {
        let now = Instant::now();

        // A poisoned map still holds valid entries
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let key = (response_topic.to_string(), correlation_data.to_vec());
        match seen.get(&key) {
            Some(&expiry) if expiry > now => return false,
            Some(_) => {}
            None => self.make_room(&mut seen, now),
        }

        seen.insert(key, now + self.window);
        true
    }

    /// Free at least one slot once the table is at capacity.
    fn make_room(&self, seen: &mut HashMap<(String, Vec<u8>), Instant>, now: Instant) {
        if seen.len() < self.capacity {
            return;
        }
        seen.retain(|_, expiry| *expiry > now);
        if seen.len() < self.capacity {
            return;
        }

        // Every key shares the same window, so the earliest expiry is the
        // oldest request. Evict a tenth of the table at a time.
        let evict = (seen.len() + 1 - self.capacity).max(self.capacity / 10);
        let mut expiries: Vec<Instant> = seen.values().copied().collect();
        let (_, cutoff, _) = expiries.select_nth_unstable(evict - 1);
        let cutoff = *cutoff;
        seen.retain(|_, expiry| *expiry > cutoff);
        debug!(
            evicted = evict,
            remaining = seen.len(),
            "Redelivery filter full, evicted oldest requests"
        );
    }

    /// Number of remembered requests, expired or not.
    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
