//! Daily inventory value snapshots.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Point-in-time value of an account's held inventory. One row per account
/// and day; re-valuing the same day overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub account_id: String,
    pub total_value: f64,
    pub total_items: usize,
    pub snapshot_date: NaiveDate,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn upsert(&self, snapshot: Snapshot) -> Result<()>;
    /// Snapshots for the account in ascending date order.
    async fn list(&self, account_id: &str) -> Result<Vec<Snapshot>>;
}
