//! Transaction model and ledger store abstraction.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => bail!("trade side must be 'BUY' or 'SELL', got '{other}'"),
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Where a transaction came from. Informational only, no effect on P&L math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Manual,
    ImportedMarket,
    ImportedTrade,
}

impl Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Manual => write!(f, "manual"),
            Provenance::ImportedMarket => write!(f, "imported-market"),
            Provenance::ImportedTrade => write!(f, "imported-trade"),
        }
    }
}

/// One recorded buy or sell. Immutable once created; `net_amount` is always
/// derived from price, fee and side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub item_name: String,
    pub side: Side,
    pub price: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub source: Provenance,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: &str,
        item_name: &str,
        side: Side,
        price: f64,
        fee: f64,
        source: Provenance,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: trade_key(account_id, item_name, source, timestamp),
            account_id: account_id.to_string(),
            item_name: item_name.to_string(),
            side,
            price,
            fee,
            net_amount: net_amount(side, price, fee),
            source,
            timestamp,
        }
    }
}

/// Cash flow of a transaction: buys cost price plus fee, sells return price
/// minus fee.
pub fn net_amount(side: Side, price: f64, fee: f64) -> f64 {
    match side {
        Side::Buy => -(price + fee),
        Side::Sell => price - fee,
    }
}

/// Deterministic identity key. Re-importing the same record produces the same
/// key, which is what makes imports idempotent. Market imports carry a marker
/// so they cannot collide with a manual entry at the same second.
pub fn trade_key(
    account_id: &str,
    item_name: &str,
    source: Provenance,
    timestamp: DateTime<Utc>,
) -> String {
    let ts = timestamp.timestamp();
    match source {
        Provenance::ImportedMarket => format!("{account_id}:market:{item_name}:{ts}"),
        Provenance::ImportedTrade => format!("{account_id}:trade:{item_name}:{ts}"),
        Provenance::Manual => format!("{account_id}:{item_name}:{ts}"),
    }
}

/// Record store for transactions. Keyed by the deterministic trade key;
/// ordering on `list` is not guaranteed, the P&L engine sorts for itself.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list(&self, account_id: &str) -> Result<Vec<Transaction>>;
    async fn insert(&self, tx: Transaction) -> Result<()>;
    async fn contains(&self, id: &str) -> Result<bool>;
    /// Removes the transaction; `false` if no such id exists for the account.
    async fn remove(&self, account_id: &str, id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("SELL".parse::<Side>().unwrap(), Side::Sell);
        let err = "hold".parse::<Side>().unwrap_err();
        assert!(err.to_string().contains("'hold'"));
    }

    #[test]
    fn test_net_amount_by_side() {
        assert_eq!(net_amount(Side::Buy, 10.0, 0.5), -10.5);
        assert_eq!(net_amount(Side::Sell, 15.0, 0.75), 14.25);
    }

    #[test]
    fn test_trade_key_is_deterministic() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let a = trade_key("acct", "AK-47 | Redline", Provenance::Manual, ts);
        let b = trade_key("acct", "AK-47 | Redline", Provenance::Manual, ts);
        assert_eq!(a, b);

        // Market imports never collide with a manual entry at the same second
        let m = trade_key("acct", "AK-47 | Redline", Provenance::ImportedMarket, ts);
        assert_ne!(a, m);
    }

    #[test]
    fn test_transaction_derives_net_amount() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let tx = Transaction::new(
            "acct",
            "Glock-18 | Fade",
            Side::Sell,
            100.0,
            5.0,
            Provenance::Manual,
            ts,
        );
        assert_eq!(tx.net_amount, 95.0);
        assert_eq!(tx.id, "acct:Glock-18 | Fade:1748779200");
    }
}
