//! Price cache tests for swap-quoter.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use rust_decimal_macros::dec;
use swap_quoter::data_management::cache::{CacheMetrics, PriceCache};
use swap_quoter::types::PriceQuote;

fn quote(id: &str, fetched_at: chrono::DateTime<Utc>) -> PriceQuote {
    PriceQuote::new(id, dec!(2500.12), fetched_at).unwrap()
}

#[test]
fn test_fresh_entry_is_returned() {
    let cache = PriceCache::new();
    let now = Utc::now();
    cache.put(quote("ethereum", now));

    let later = now + TimeDelta::seconds(59);
    let hit = cache.get_at("ethereum", later).expect("entry within ttl");
    assert_eq!(hit.price_usd(), dec!(2500.12));
    assert_eq!(hit.fetched_at(), now);
}

#[test]
fn test_entry_expires_after_sixty_seconds() {
    let cache = PriceCache::new();
    let now = Utc::now();
    cache.put(quote("ethereum", now));

    let expired = now + TimeDelta::seconds(60) + TimeDelta::milliseconds(1);
    assert!(cache.get_at("ethereum", expired).is_none());
    // The stale entry was dropped by the lookup.
    assert_eq!(cache.metrics().entries, 0);
}

#[test]
fn test_put_overwrites_and_metrics_count() {
    let cache = PriceCache::with_settings(Duration::from_secs(30), 10);
    let now = Utc::now();
    cache.put(quote("ethereum", now - TimeDelta::seconds(40)));
    assert!(cache.get_at("ethereum", now).is_none());

    cache.put(quote("ethereum", now));
    assert!(cache.get_at("ethereum", now).is_some());
    assert!(cache.get_at("bitcoin", now).is_none());

    assert_eq!(cache.metrics(), CacheMetrics { hits: 1, misses: 2, entries: 1 });
}

#[test]
fn test_capacity_evicts_least_recent() {
    let cache = PriceCache::with_settings(Duration::from_secs(60), 2);
    let now = Utc::now();
    cache.put(quote("a", now));
    cache.put(quote("b", now));
    assert!(cache.get_at("a", now).is_some());
    cache.put(quote("c", now));

    assert!(cache.get_at("a", now).is_some());
    assert!(cache.get_at("b", now).is_none());
    assert!(cache.get_at("c", now).is_some());
}

#[test]
fn test_clear_drops_everything() {
    let cache = PriceCache::new();
    cache.put(quote("ethereum", Utc::now()));
    cache.clear();
    assert!(cache.get("ethereum").is_none());
}
