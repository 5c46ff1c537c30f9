//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single quote returned by an upstream market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub currency: String,
}

/// One upstream price source (e.g. a marketplace listings API).
///
/// Implementations own their HTTP client and timeouts. A failed query is an
/// ordinary `Err`; the resolver decides how to recover from it.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stable identifier recorded alongside cached prices.
    fn id(&self) -> &'static str;

    async fn query(&self, item_name: &str) -> Result<PriceQuote>;
}

/// Whether a resolved price came straight from a source or from an expired
/// cache entry kept as a last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Outcome of a price resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub price: f64,
    pub source: String,
    pub freshness: Freshness,
}

impl ResolvedPrice {
    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }
}

/// Side-by-side quotes from both sources, always fetched live.
#[derive(Debug, Clone, Serialize)]
pub struct DualQuote {
    pub item_name: String,
    pub primary_price: Option<f64>,
    pub secondary_price: Option<f64>,
    pub best_price: Option<f64>,
    pub best_source: Option<String>,
}
