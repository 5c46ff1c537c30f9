//! Ledger write operations: manual entry and batch market-history import.

use crate::core::ledger::{LedgerStore, Provenance, Side, Transaction, trade_key};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Commission the marketplace takes on each transaction, applied to imported
/// market history.
pub const MARKET_FEE_RATE: f64 = 0.05;

/// One record from a market-history export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub item_name: String,
    pub side: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a batch import. Successes are committed even when other records
/// skip or fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

/// Validates and records a manual transaction.
pub async fn add_manual(
    ledger: &dyn LedgerStore,
    account_id: &str,
    item_name: &str,
    side: &str,
    price: f64,
    fee: f64,
    timestamp: DateTime<Utc>,
) -> Result<Transaction> {
    let side: Side = side.parse()?;
    if price < 0.0 || fee < 0.0 {
        bail!("price and fee must be non-negative");
    }

    let tx = Transaction::new(
        account_id,
        item_name,
        side,
        price,
        fee,
        Provenance::Manual,
        timestamp,
    );
    ledger.insert(tx.clone()).await?;
    info!(id = %tx.id, %side, price, "recorded transaction");
    Ok(tx)
}

/// Imports market-history records with an auto-calculated marketplace fee.
///
/// Records are processed independently: a record whose identity key already
/// exists is skipped (idempotent re-import), a malformed record is counted as
/// failed, and neither aborts the batch. Committed records stay valid if the
/// batch is abandoned midway; the next run skips them.
pub async fn import_market_history(
    ledger: &dyn LedgerStore,
    account_id: &str,
    records: &[ImportRecord],
) -> Result<ImportReport> {
    let mut report = ImportReport {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        let side: Side = match record.side.parse() {
            Ok(side) => side,
            Err(e) => {
                warn!(item = %record.item_name, error = %e, "skipping malformed import record");
                report.failed += 1;
                continue;
            }
        };
        if record.price < 0.0 {
            warn!(item = %record.item_name, price = record.price, "skipping negative-price record");
            report.failed += 1;
            continue;
        }

        let id = trade_key(
            account_id,
            &record.item_name,
            Provenance::ImportedMarket,
            record.timestamp,
        );
        if ledger.contains(&id).await? {
            debug!(%id, "already imported, skipping");
            report.skipped += 1;
            continue;
        }

        let fee = record.price * MARKET_FEE_RATE;
        let tx = Transaction::new(
            account_id,
            &record.item_name,
            side,
            record.price,
            fee,
            Provenance::ImportedMarket,
            record.timestamp,
        );
        match ledger.insert(tx).await {
            Ok(()) => report.imported += 1,
            Err(e) => {
                warn!(item = %record.item_name, error = %e, "failed to store imported record");
                report.failed += 1;
            }
        }
    }

    info!(
        imported = report.imported,
        skipped = report.skipped,
        failed = report.failed,
        "market history import finished"
    );
    Ok(report)
}

/// Reads an export file produced by the browser extension: a JSON array of
/// [`ImportRecord`].
pub fn read_export_file(path: &std::path::Path) -> Result<Vec<ImportRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read export file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse export file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLedger;
    use chrono::TimeZone;

    fn record(item: &str, side: &str, price: f64) -> ImportRecord {
        ImportRecord {
            item_name: item.to_string(),
            side: side.to_string(),
            price,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_import_applies_market_fee() {
        let ledger = MemoryLedger::new();
        let report =
            import_market_history(&ledger, "acct", &[record("AK-47 | Redline", "SELL", 20.0)])
                .await
                .unwrap();

        assert_eq!(report.imported, 1);
        let stored = ledger.list("acct").await.unwrap();
        assert_eq!(stored[0].fee, 1.0);
        assert_eq!(stored[0].net_amount, 19.0);
        assert_eq!(stored[0].source, Provenance::ImportedMarket);
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let ledger = MemoryLedger::new();
        let records = vec![record("AK-47 | Redline", "BUY", 10.0)];

        let first = import_market_history(&ledger, "acct", &records)
            .await
            .unwrap();
        assert_eq!(first.imported, 1);
        assert_eq!(first.skipped, 0);

        let second = import_market_history(&ledger, "acct", &records)
            .await
            .unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(ledger.list("acct").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_record_does_not_abort_batch() {
        let ledger = MemoryLedger::new();
        let records = vec![
            record("AK-47 | Redline", "BUY", 10.0),
            record("M4A4 | Asiimov", "TRADE", 50.0),
            record("Glock-18 | Fade", "SELL", -5.0),
            record("AWP | Asiimov", "SELL", 60.0),
        ];

        let report = import_market_history(&ledger, "acct", &records)
            .await
            .unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.total, 4);
    }

    #[tokio::test]
    async fn test_add_manual_rejects_bad_side() {
        let ledger = MemoryLedger::new();
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let err = add_manual(&ledger, "acct", "AK-47 | Redline", "hold", 10.0, 0.0, ts)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'hold'"));
        assert!(ledger.list("acct").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_manual_defaults() {
        let ledger = MemoryLedger::new();
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let tx = add_manual(&ledger, "acct", "AK-47 | Redline", "buy", 10.0, 0.0, ts)
            .await
            .unwrap();
        assert_eq!(tx.source, Provenance::Manual);
        assert_eq!(tx.net_amount, -10.0);
    }
}
