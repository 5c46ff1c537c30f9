//! Core business logic abstractions

pub mod cache;
pub mod clock;
pub mod config;
pub mod import;
pub mod ledger;
pub mod log;
pub mod pnl;
pub mod price;
pub mod resolver;
pub mod snapshot;
pub mod valuation;

// Re-export main types for cleaner imports
pub use cache::{CachedPrice, PriceStore};
pub use ledger::{LedgerStore, Provenance, Side, Transaction};
pub use price::{DualQuote, Freshness, PriceQuote, PriceSource, ResolvedPrice};
pub use resolver::PriceResolver;
