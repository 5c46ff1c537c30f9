//! Price resolution with caching, source fallback and rate limiting.

use crate::core::cache::{CachedPrice, PriceStore};
use crate::core::clock::Clock;
use crate::core::price::{DualQuote, Freshness, PriceSource, ResolvedPrice};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Enforces a minimum spacing between outbound calls. Holding the lock across
/// the sleep serializes callers, so concurrent batches share one schedule.
pub struct Pacer {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Resolves current prices for items, consulting the injected cache store
/// before walking an ordered chain of upstream sources.
pub struct PriceResolver {
    sources: Vec<Arc<dyn PriceSource>>,
    store: Arc<dyn PriceStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    pacer: Pacer,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PriceResolver {
    pub fn new(
        sources: Vec<Arc<dyn PriceSource>>,
        store: Arc<dyn PriceStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        spacing: Duration,
    ) -> Self {
        Self {
            sources,
            store,
            clock,
            ttl,
            pacer: Pacer::new(spacing),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, entry: &CachedPrice) -> bool {
        entry.age_secs(self.clock.now()) < self.ttl.as_secs() as i64
    }

    fn fresh_hit(entry: CachedPrice) -> ResolvedPrice {
        ResolvedPrice {
            price: entry.price,
            source: entry.source,
            freshness: Freshness::Fresh,
        }
    }

    /// Per-item guard so concurrent resolutions of the same name collapse to
    /// a single outbound call; latecomers find the fresh entry on re-check.
    async fn entry_guard(&self, item_name: &str) -> Arc<Mutex<()>> {
        let mut map = self.in_flight.lock().await;
        map.entry(item_name.to_string()).or_default().clone()
    }

    /// Walks the source chain in order, returning the first successful quote.
    /// A source failure is logged and degrades to trying the next source.
    async fn query_chain(&self, item_name: &str) -> Option<(f64, &'static str)> {
        for source in &self.sources {
            match source.query(item_name).await {
                Ok(quote) => {
                    debug!(
                        source = source.id(),
                        item = item_name,
                        price = quote.price,
                        "source returned price"
                    );
                    return Some((quote.price, source.id()));
                }
                Err(e) => {
                    warn!(source = source.id(), item = item_name, error = %e, "price source failed");
                }
            }
        }
        None
    }

    /// Resolves the best-available current price for an item.
    ///
    /// A fresh cache entry short-circuits without any external call. On a miss
    /// or a stale entry the source chain is walked and the first success is
    /// upserted; if every source fails, a stale entry is returned marked
    /// [`Freshness::Stale`], and `None` only when there is nothing at all.
    pub async fn resolve_price(&self, item_name: &str) -> Option<ResolvedPrice> {
        if let Some(entry) = self.store.get(item_name).await {
            if self.is_fresh(&entry) {
                debug!(item = item_name, "price cache hit");
                return Some(Self::fresh_hit(entry));
            }
        }

        let guard = self.entry_guard(item_name).await;
        let _resolving = guard.lock().await;

        // Another caller may have refreshed the entry while we waited.
        if let Some(entry) = self.store.get(item_name).await {
            if self.is_fresh(&entry) {
                return Some(Self::fresh_hit(entry));
            }
        }

        if let Some((price, source)) = self.query_chain(item_name).await {
            let entry = CachedPrice {
                item_name: item_name.to_string(),
                price,
                source: source.to_string(),
                cached_at: self.clock.now(),
            };
            self.store.put(entry).await;
            return Some(ResolvedPrice {
                price,
                source: source.to_string(),
                freshness: Freshness::Fresh,
            });
        }

        match self.store.get(item_name).await {
            Some(entry) => {
                warn!(
                    item = item_name,
                    age_secs = entry.age_secs(self.clock.now()),
                    "all sources failed, serving stale cached price"
                );
                Some(ResolvedPrice {
                    price: entry.price,
                    source: entry.source,
                    freshness: Freshness::Stale,
                })
            }
            None => {
                warn!(item = item_name, "all sources failed and no cached price");
                None
            }
        }
    }

    /// Resolves each name independently; names that cannot be resolved are
    /// omitted rather than aborting the batch. Names missing a fresh cache
    /// entry are paced to respect upstream quotas; cache hits are exempt.
    pub async fn resolve_many(&self, item_names: &[String]) -> HashMap<String, ResolvedPrice> {
        let mut prices = HashMap::new();

        for name in item_names {
            if let Some(entry) = self.store.get(name).await {
                if self.is_fresh(&entry) {
                    prices.insert(name.clone(), Self::fresh_hit(entry));
                    continue;
                }
            }

            self.pacer.wait().await;
            if let Some(resolved) = self.resolve_price(name).await {
                prices.insert(name.clone(), resolved);
            }
        }

        debug!(
            requested = item_names.len(),
            resolved = prices.len(),
            "batch price resolution finished"
        );
        prices
    }

    /// Queries both sources live (never cache-backed) and picks the lowest
    /// available price, the better deal from a buyer's perspective.
    pub async fn dual_price(&self, item_name: &str) -> DualQuote {
        let primary = self.sources.first();
        let secondary = self.sources.get(1);

        let (primary_price, secondary_price) = futures::future::join(
            Self::query_one(primary, item_name),
            Self::query_one(secondary, item_name),
        )
        .await;

        let (best_price, best_source) = match (primary_price, secondary_price) {
            (Some(p), Some(s)) => {
                if s < p {
                    (Some(s), secondary.map(|src| src.id().to_string()))
                } else {
                    (Some(p), primary.map(|src| src.id().to_string()))
                }
            }
            (Some(p), None) => (Some(p), primary.map(|src| src.id().to_string())),
            (None, Some(s)) => (Some(s), secondary.map(|src| src.id().to_string())),
            (None, None) => (None, None),
        };

        DualQuote {
            item_name: item_name.to_string(),
            primary_price,
            secondary_price,
            best_price,
            best_source,
        }
    }

    async fn query_one(source: Option<&Arc<dyn PriceSource>>, item_name: &str) -> Option<f64> {
        let source = source?;
        match source.query(item_name).await {
            Ok(quote) => Some(quote.price),
            Err(e) => {
                warn!(source = source.id(), item = item_name, error = %e, "price source failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::test_clock::ManualClock;
    use crate::core::price::PriceQuote;
    use crate::store::memory::MemoryPriceStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSource {
        id: &'static str,
        price: Option<f64>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn ok(id: &'static str, price: f64) -> Arc<Self> {
            Arc::new(Self {
                id,
                price: Some(price),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                price: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(id: &'static str, price: f64, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                id,
                price: Some(price),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for MockSource {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn query(&self, item_name: &str) -> Result<PriceQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.price {
                Some(price) => Ok(PriceQuote {
                    price,
                    currency: "USD".to_string(),
                }),
                None => Err(anyhow!("source unavailable for {item_name}")),
            }
        }
    }

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn resolver(
        sources: Vec<Arc<dyn PriceSource>>,
        store: Arc<MemoryPriceStore>,
        clock: Arc<ManualClock>,
    ) -> PriceResolver {
        PriceResolver::new(
            sources,
            store,
            clock,
            Duration::from_secs(300),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_makes_no_external_call() {
        let primary = MockSource::ok("primary", 12.5);
        let secondary = MockSource::ok("secondary", 11.0);
        let store = Arc::new(MemoryPriceStore::new());
        let r = resolver(
            vec![primary.clone(), secondary.clone()],
            store,
            manual_clock(),
        );

        let first = r.resolve_price("AK-47 | Redline").await.unwrap();
        assert_eq!(first.price, 12.5);
        assert_eq!(first.source, "primary");
        assert_eq!(primary.call_count(), 1);

        let second = r.resolve_price("AK-47 | Redline").await.unwrap();
        assert_eq!(second.price, 12.5);
        assert_eq!(second.freshness, Freshness::Fresh);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_secondary_source_used_when_primary_fails() {
        let primary = MockSource::failing("primary");
        let secondary = MockSource::ok("secondary", 9.99);
        let store = Arc::new(MemoryPriceStore::new());
        let r = resolver(
            vec![primary.clone(), secondary.clone()],
            store.clone(),
            manual_clock(),
        );

        let resolved = r.resolve_price("AWP | Asiimov").await.unwrap();
        assert_eq!(resolved.price, 9.99);
        assert_eq!(resolved.source, "secondary");
        assert_eq!(resolved.freshness, Freshness::Fresh);

        // The cached entry carries the secondary's tag too
        let entry = store.get("AWP | Asiimov").await.unwrap();
        assert_eq!(entry.source, "secondary");
    }

    #[tokio::test]
    async fn test_stale_entry_served_when_all_sources_fail() {
        let primary = MockSource::failing("primary");
        let secondary = MockSource::failing("secondary");
        let clock = manual_clock();
        let store = Arc::new(MemoryPriceStore::new());
        store
            .put(CachedPrice {
                item_name: "M4A4 | Howl".to_string(),
                price: 4200.0,
                source: "primary".to_string(),
                cached_at: clock.now() - ChronoDuration::seconds(600),
            })
            .await;

        let r = resolver(vec![primary.clone(), secondary.clone()], store, clock);
        let resolved = r.resolve_price("M4A4 | Howl").await.unwrap();
        assert_eq!(resolved.price, 4200.0);
        assert!(resolved.is_stale());
        // Stale entries still trigger a re-resolution attempt first
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_absent_when_all_sources_fail_and_no_cache() {
        let r = resolver(
            vec![MockSource::failing("primary"), MockSource::failing("secondary")],
            Arc::new(MemoryPriceStore::new()),
            manual_clock(),
        );
        assert!(r.resolve_price("Unknown Item").await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiry_triggers_re_resolution() {
        let primary = MockSource::ok("primary", 3.0);
        let clock = manual_clock();
        let store = Arc::new(MemoryPriceStore::new());
        let r = resolver(vec![primary.clone()], store, clock.clone());

        r.resolve_price("P250 | Sand Dune").await.unwrap();
        assert_eq!(primary.call_count(), 1);

        clock.advance_secs(299);
        r.resolve_price("P250 | Sand Dune").await.unwrap();
        assert_eq!(primary.call_count(), 1);

        clock.advance_secs(2);
        let resolved = r.resolve_price("P250 | Sand Dune").await.unwrap();
        assert_eq!(resolved.freshness, Freshness::Fresh);
        assert_eq!(primary.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_collapse_to_one_call() {
        let primary = MockSource::slow("primary", 7.5, Duration::from_millis(50));
        let r = resolver(
            vec![primary.clone()],
            Arc::new(MemoryPriceStore::new()),
            manual_clock(),
        );

        let (a, b) = tokio::join!(
            r.resolve_price("AK-47 | Redline"),
            r.resolve_price("AK-47 | Redline")
        );
        assert_eq!(a.unwrap().price, 7.5);
        assert_eq!(b.unwrap().price, 7.5);
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_many_skips_failures_and_cache_hits_short_circuit() {
        struct PerItemSource {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl PriceSource for PerItemSource {
            fn id(&self) -> &'static str {
                "primary"
            }

            async fn query(&self, item_name: &str) -> Result<PriceQuote> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                match item_name {
                    "AK-47 | Redline" => Ok(PriceQuote {
                        price: 12.0,
                        currency: "USD".to_string(),
                    }),
                    _ => Err(anyhow!("no listings")),
                }
            }
        }

        let source = Arc::new(PerItemSource {
            calls: AtomicUsize::new(0),
        });
        let clock = manual_clock();
        let store = Arc::new(MemoryPriceStore::new());
        store
            .put(CachedPrice {
                item_name: "Glock-18 | Fade".to_string(),
                price: 310.0,
                source: "secondary".to_string(),
                cached_at: clock.now(),
            })
            .await;

        let r = resolver(vec![source.clone()], store, clock);
        let names = vec![
            "Glock-18 | Fade".to_string(),
            "AK-47 | Redline".to_string(),
            "Unknown Item".to_string(),
        ];
        let prices = r.resolve_many(&names).await;

        assert_eq!(prices.len(), 2);
        assert_eq!(prices["Glock-18 | Fade"].price, 310.0);
        assert_eq!(prices["AK-47 | Redline"].price, 12.0);
        assert!(!prices.contains_key("Unknown Item"));
        // Only the two non-cached names reached the source
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dual_price_picks_lowest() {
        let primary = MockSource::ok("csfloat", 12.00);
        let secondary = MockSource::ok("steam_market", 10.50);
        let r = resolver(
            vec![primary, secondary],
            Arc::new(MemoryPriceStore::new()),
            manual_clock(),
        );

        let quote = r.dual_price("AK-47 | Redline").await;
        assert_eq!(quote.primary_price, Some(12.00));
        assert_eq!(quote.secondary_price, Some(10.50));
        assert_eq!(quote.best_price, Some(10.50));
        assert_eq!(quote.best_source.as_deref(), Some("steam_market"));
    }

    #[tokio::test]
    async fn test_dual_price_with_one_source_down() {
        let primary = MockSource::failing("csfloat");
        let secondary = MockSource::ok("steam_market", 8.0);
        let r = resolver(
            vec![primary, secondary],
            Arc::new(MemoryPriceStore::new()),
            manual_clock(),
        );

        let quote = r.dual_price("AWP | Asiimov").await;
        assert_eq!(quote.primary_price, None);
        assert_eq!(quote.best_price, Some(8.0));
        assert_eq!(quote.best_source.as_deref(), Some("steam_market"));

        let down = resolver(
            vec![MockSource::failing("csfloat"), MockSource::failing("steam_market")],
            Arc::new(MemoryPriceStore::new()),
            manual_clock(),
        );
        let quote = down.dual_price("AWP | Asiimov").await;
        assert_eq!(quote.best_price, None);
        assert_eq!(quote.best_source, None);
    }

    #[tokio::test]
    async fn test_dual_price_never_reads_cache() {
        let primary = MockSource::ok("csfloat", 5.0);
        let clock = manual_clock();
        let store = Arc::new(MemoryPriceStore::new());
        store
            .put(CachedPrice {
                item_name: "AK-47 | Redline".to_string(),
                price: 1.0,
                source: "csfloat".to_string(),
                cached_at: clock.now(),
            })
            .await;

        let r = resolver(vec![primary.clone()], store, clock);
        let quote = r.dual_price("AK-47 | Redline").await;
        assert_eq!(quote.primary_price, Some(5.0));
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pacer_enforces_spacing() {
        let pacer = Pacer::new(Duration::from_millis(50));
        let started = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
