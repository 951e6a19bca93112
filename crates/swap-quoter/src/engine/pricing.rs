//! Cache-first price lookups with write-through on miss.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::data_management::cache::PriceCache;
use crate::data_management::price_source::PriceSource;
use crate::types::{PriceQuote, Result, SwapError};

type InFlight = Shared<BoxFuture<'static, Result<PriceQuote>>>;
type InFlightMap = Mutex<HashMap<String, InFlight>>;

/// Prices tokens through a [`PriceCache`], falling back to a [`PriceSource`].
///
/// Concurrent misses for one token share a single upstream request. The
/// request runs on its own task, so it finishes, fills the cache and leaves
/// the in-flight map even when every caller waiting on it has gone away.
pub struct PriceService {
    cache: Arc<PriceCache>,
    source: Arc<dyn PriceSource>,
    in_flight: Arc<InFlightMap>,
}

impl PriceService {
    pub fn new(cache: Arc<PriceCache>, source: Arc<dyn PriceSource>) -> Self {
        Self { cache, source, in_flight: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Number of upstream fetches currently running.
    pub fn pending_fetches(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub async fn price(&self, token_id: &str) -> Result<PriceQuote> {
        if let Some(quote) = self.cache.get(token_id) {
            debug!(token_id, "price cache hit");
            return Ok(quote);
        }
        self.join_or_start(token_id).await
    }

    fn join_or_start(&self, token_id: &str) -> InFlight {
        let mut in_flight = lock(&self.in_flight);
        if let Some(existing) = in_flight.get(token_id) {
            debug!(token_id, "joining in-flight price fetch");
            return existing.clone();
        }

        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let registry = Arc::clone(&self.in_flight);
        let id = token_id.to_string();
        // Only this task removes the entry it was registered under.
        let task = tokio::spawn(async move {
            let result = fetch_quote(source.as_ref(), &cache, &id).await;
            lock(&registry).remove(&id);
            result
        });

        let id = token_id.to_string();
        let fetch = async move {
            match task.await {
                Ok(result) => result,
                Err(join) => Err(SwapError::price_unavailable(id, join)),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(token_id.to_string(), fetch.clone());
        fetch
    }
}

async fn fetch_quote(source: &dyn PriceSource, cache: &PriceCache, token_id: &str) -> Result<PriceQuote> {
    let price = source.fetch(token_id).await?;
    let quote = PriceQuote::new(token_id, price, Utc::now()).map_err(|e| SwapError::price_unavailable(token_id, e))?;
    cache.put(quote.clone());
    Ok(quote)
}

fn lock(map: &InFlightMap) -> MutexGuard<'_, HashMap<String, InFlight>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
