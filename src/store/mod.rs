pub mod disk;
pub mod memory;

use crate::core::cache::PriceStore;
use crate::core::ledger::LedgerStore;
use crate::core::snapshot::SnapshotStore;
use anyhow::{Context, Result};
use disk::{DiskLedger, DiskPriceStore, DiskSnapshotStore};
use fjall::PartitionCreateOptions;
use memory::{MemoryLedger, MemoryPriceStore, MemorySnapshotStore};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The application's stores, behind their traits so the core never knows
/// which backend it is talking to.
pub struct Stores {
    pub prices: Arc<dyn PriceStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Keeps the keyspace (and its flush machinery) alive for the handles.
    _keyspace: Option<fjall::Keyspace>,
}

impl Stores {
    /// Opens durable stores under `data_path`.
    pub fn open(data_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_path).with_context(|| {
            format!("Failed to create data directory: {}", data_path.display())
        })?;
        let keyspace = fjall::Config::new(data_path.join("db"))
            .open()
            .context("Failed to open keyspace")?;
        debug!("Opened keyspace at {}", data_path.display());

        let prices = keyspace.open_partition("prices", PartitionCreateOptions::default())?;
        let ledger = keyspace.open_partition("ledger", PartitionCreateOptions::default())?;
        let snapshots = keyspace.open_partition("snapshots", PartitionCreateOptions::default())?;

        Ok(Self {
            prices: Arc::new(DiskPriceStore::new(prices)),
            ledger: Arc::new(DiskLedger::new(ledger)),
            snapshots: Arc::new(DiskSnapshotStore::new(snapshots)),
            _keyspace: Some(keyspace),
        })
    }

    /// Volatile stores; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            prices: Arc::new(MemoryPriceStore::new()),
            ledger: Arc::new(MemoryLedger::new()),
            snapshots: Arc::new(MemorySnapshotStore::new()),
            _keyspace: None,
        }
    }
}
