//! Price cache store abstraction.
//!
//! The store only knows how to get and upsert entries. Freshness is the
//! resolver's business, so tests can drive expiry with a fake clock instead
//! of sleeping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached price for one item. At most one entry exists per `item_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPrice {
    pub item_name: String,
    pub price: f64,
    pub source: String,
    pub cached_at: DateTime<Utc>,
}

impl CachedPrice {
    /// Age of this entry relative to `now`, in whole seconds.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_seconds()
    }
}

/// Key-value store for cached prices. Entries are upserted, never expired by
/// the store itself; a stale entry is kept as the fallback of last resort.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn get(&self, item_name: &str) -> Option<CachedPrice>;
    async fn put(&self, entry: CachedPrice);
}
