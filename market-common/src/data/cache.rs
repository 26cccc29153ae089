// market-common/src/data/cache.rs
// In-memory TTL cache for provider series. Injected into the service layer.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{PriceBar, Timeframe};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: NaiveDate,
}

impl SeriesKey {
    pub fn new(symbol: &str, timeframe: Timeframe, start: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
            start,
        }
    }
}

struct CacheEntry {
    bars: Arc<Vec<PriceBar>>,
    inserted_at: Instant,
}

/// Series cache with a time-to-live and a capacity bound.
///
/// Clones share the same store.
#[derive(Clone)]
pub struct SeriesCache {
    entries: Arc<RwLock<HashMap<SeriesKey, CacheEntry>>>,
    ttl: Duration,
    max_series: usize,
}

impl SeriesCache {
    pub fn new(ttl: Duration, max_series: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_series: max_series.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, dropping it if it has expired.
    pub async fn get(&self, key: &SeriesKey) -> Option<Arc<Vec<PriceBar>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !self.is_expired(entry) => {
                    debug!("Cache hit: {} {}", key.symbol, key.timeframe);
                    return Some(Arc::clone(&entry.bars));
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.evict_expired(key).await;
        None
    }

    /// Remove `key` only if it is still expired under the write lock.
    async fn evict_expired(&self, key: &SeriesKey) -> bool {
        let mut entries = self.entries.write().await;
        if !entries.get(key).is_some_and(|entry| self.is_expired(entry)) {
            return false;
        }
        debug!("Cache entry expired: {} {}", key.symbol, key.timeframe);
        entries.remove(key);
        true
    }

    /// Store a series, evicting expired entries first and then the oldest one at capacity.
    pub async fn insert(&self, key: SeriesKey, bars: Vec<PriceBar>) -> Arc<Vec<PriceBar>> {
        let bars = Arc::new(bars);
        let mut entries = self.entries.write().await;

        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        if !entries.contains_key(&key) && entries.len() >= self.max_series {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full, evicting {} {}", oldest.symbol, oldest.timeframe);
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                bars: Arc::clone(&bars),
                inserted_at: Instant::now(),
            },
        );
        bars
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() >= self.ttl
    }
}
