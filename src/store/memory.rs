//! In-memory store implementations, used by tests and as the fallback when no
//! data directory is available.

use crate::core::cache::{CachedPrice, PriceStore};
use crate::core::ledger::{LedgerStore, Transaction};
use crate::core::snapshot::{Snapshot, SnapshotStore};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
pub struct MemoryPriceStore {
    inner: Mutex<HashMap<String, CachedPrice>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn get(&self, item_name: &str) -> Option<CachedPrice> {
        let cache = self.inner.lock().await;
        let entry = cache.get(item_name).cloned();
        if entry.is_some() {
            debug!("Price store HIT for {}", item_name);
        } else {
            debug!("Price store MISS for {}", item_name);
        }
        entry
    }

    async fn put(&self, entry: CachedPrice) {
        let mut cache = self.inner.lock().await;
        debug!("Price store PUT for {}", entry.item_name);
        cache.insert(entry.item_name.clone(), entry);
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<HashMap<String, Transaction>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn list(&self, account_id: &str) -> Result<Vec<Transaction>> {
        let ledger = self.inner.lock().await;
        Ok(ledger
            .values()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, tx: Transaction) -> Result<()> {
        let mut ledger = self.inner.lock().await;
        ledger.insert(tx.id.clone(), tx);
        Ok(())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        let ledger = self.inner.lock().await;
        Ok(ledger.contains_key(id))
    }

    async fn remove(&self, account_id: &str, id: &str) -> Result<bool> {
        let mut ledger = self.inner.lock().await;
        match ledger.get(id) {
            Some(tx) if tx.account_id == account_id => {
                ledger.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<HashMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert(&self, snapshot: Snapshot) -> Result<()> {
        let key = format!("{}:{}", snapshot.account_id, snapshot.snapshot_date);
        let mut snapshots = self.inner.lock().await;
        snapshots.insert(key, snapshot);
        Ok(())
    }

    async fn list(&self, account_id: &str) -> Result<Vec<Snapshot>> {
        let snapshots = self.inner.lock().await;
        let mut rows: Vec<Snapshot> = snapshots
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.snapshot_date);
        Ok(rows)
    }
}
