//! Durable stores backed by fjall partitions.
//!
//! Values are JSON-encoded. Read errors on the price cache degrade to a miss;
//! ledger and snapshot errors propagate, since silently losing transactions
//! would corrupt P&L.

use crate::core::cache::{CachedPrice, PriceStore};
use crate::core::ledger::{LedgerStore, Transaction};
use crate::core::snapshot::{Snapshot, SnapshotStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::PartitionHandle;
use tracing::debug;

pub struct DiskPriceStore {
    partition: PartitionHandle,
}

impl DiskPriceStore {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

#[async_trait]
impl PriceStore for DiskPriceStore {
    async fn get(&self, item_name: &str) -> Option<CachedPrice> {
        let res: Result<Option<CachedPrice>> = (|| {
            match self.partition.get(item_name)? {
                Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
                None => Ok(None),
            }
        })();

        match res {
            Ok(Some(entry)) => {
                debug!("Price store HIT for {}", item_name);
                Some(entry)
            }
            Ok(None) => {
                debug!("Price store MISS for {}", item_name);
                None
            }
            Err(e) => {
                debug!("Price store read error for {}: {}", item_name, e);
                None
            }
        }
    }

    async fn put(&self, entry: CachedPrice) {
        let res: Result<()> = (|| {
            let raw = serde_json::to_vec(&entry)?;
            self.partition.insert(&entry.item_name, raw)?;
            Ok(())
        })();
        if let Err(e) = res {
            debug!("Price store write error for {}: {}", entry.item_name, e);
        }
    }
}

pub struct DiskLedger {
    partition: PartitionHandle,
}

impl DiskLedger {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

#[async_trait]
impl LedgerStore for DiskLedger {
    async fn list(&self, account_id: &str) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();
        for row in self.partition.prefix(format!("{account_id}:")) {
            let (_, raw) = row.context("Failed to read ledger row")?;
            let tx: Transaction =
                serde_json::from_slice(&raw).context("Failed to decode ledger row")?;
            transactions.push(tx);
        }
        Ok(transactions)
    }

    async fn insert(&self, tx: Transaction) -> Result<()> {
        let raw = serde_json::to_vec(&tx)?;
        self.partition
            .insert(&tx.id, raw)
            .with_context(|| format!("Failed to store transaction {}", tx.id))?;
        Ok(())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.partition.get(id)?.is_some())
    }

    async fn remove(&self, account_id: &str, id: &str) -> Result<bool> {
        if !id.starts_with(&format!("{account_id}:")) {
            return Ok(false);
        }
        if self.partition.get(id)?.is_none() {
            return Ok(false);
        }
        self.partition
            .remove(id)
            .with_context(|| format!("Failed to remove transaction {id}"))?;
        Ok(true)
    }
}

pub struct DiskSnapshotStore {
    partition: PartitionHandle,
}

impl DiskSnapshotStore {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

#[async_trait]
impl SnapshotStore for DiskSnapshotStore {
    async fn upsert(&self, snapshot: Snapshot) -> Result<()> {
        // ISO dates sort lexicographically, so prefix scans come back in
        // chronological order.
        let key = format!("{}:{}", snapshot.account_id, snapshot.snapshot_date);
        let raw = serde_json::to_vec(&snapshot)?;
        self.partition
            .insert(key, raw)
            .context("Failed to store snapshot")?;
        Ok(())
    }

    async fn list(&self, account_id: &str) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for row in self.partition.prefix(format!("{account_id}:")) {
            let (_, raw) = row.context("Failed to read snapshot row")?;
            let snapshot: Snapshot =
                serde_json::from_slice(&raw).context("Failed to decode snapshot row")?;
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }
}
