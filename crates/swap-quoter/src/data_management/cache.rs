//! Time-bounded caching of spot prices.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;

use crate::types::PriceQuote;

pub const DEFAULT_PRICE_TTL_SECS: u64 = 60;
pub const DEFAULT_PRICE_CAPACITY: usize = 5000;

/// Snapshot of cache hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Spot prices keyed by token id.
///
/// Expiry is checked on read: an entry older than `max_age` is dropped by the
/// lookup that finds it and reported as a miss. Nothing is evicted in the
/// background, and failed fetches are never stored.
pub struct PriceCache {
    prices: Mutex<LruCache<String, PriceQuote>>,
    max_age: Duration,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::with_settings(std::time::Duration::from_secs(DEFAULT_PRICE_TTL_SECS), DEFAULT_PRICE_CAPACITY)
    }

    pub fn with_settings(max_age: std::time::Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            prices: Mutex::new(LruCache::new(capacity)),
            max_age: Duration::from_std(max_age).unwrap_or(Duration::MAX),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Get a cached price if present and not expired.
    pub fn get(&self, token_id: &str) -> Option<PriceQuote> {
        self.get_at(token_id, Utc::now())
    }

    /// Same as [`get`](Self::get) with an explicit notion of "now".
    pub fn get_at(&self, token_id: &str, now: DateTime<Utc>) -> Option<PriceQuote> {
        let mut prices = self.lock();
        let is_expired = match prices.peek(token_id) {
            Some(quote) => now - quote.fetched_at() >= self.max_age,
            None => false,
        };

        if is_expired {
            prices.pop(token_id);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match prices.get(token_id) {
            Some(quote) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(quote.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite the price for `quote.token_id()`.
    pub fn put(&self, quote: PriceQuote) {
        self.lock().put(quote.token_id().to_string(), quote);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Retrieve current cache metrics snapshot.
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, PriceQuote>> {
        self.prices.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}
