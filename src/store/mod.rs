//! Persistence for snapshots and detail records.

pub mod csv_log;
pub mod sqlite;

pub use csv_log::SnapshotLog;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::models::{DetailRecord, ListingKey, SnapshotRecord};

/// Backing store for listings. Last writer wins, no transactions.
pub trait ListingStore {
    fn exists(&self, key: &ListingKey) -> Result<bool>;

    /// Tracked price of a known listing, `None` if unknown or never priced.
    fn lowest_price(&self, key: &ListingKey) -> Result<Option<i64>>;

    fn insert_snapshot(&mut self, record: &SnapshotRecord) -> Result<()>;

    fn insert_detail(&mut self, record: &DetailRecord) -> Result<()>;

    /// Overwrite the tracked price of `key`.
    fn update_price(&mut self, key: &ListingKey, price: i64) -> Result<()>;

    fn all_listing_keys(&self) -> Result<Vec<ListingKey>>;
}

/// Where crawl output goes: the store, plus an optional CSV snapshot log.
pub struct Sink<S> {
    store: S,
    log: Option<SnapshotLog>,
}

impl<S: ListingStore> Sink<S> {
    pub fn new(store: S, log: Option<SnapshotLog>) -> Self {
        Self { store, log }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append one page of snapshots to the log and the store.
    pub fn write_snapshots(&mut self, records: &[SnapshotRecord]) -> Result<()> {
        if let Some(log) = self.log.as_mut() {
            log.append(records)?;
        }
        for record in records {
            self.store.insert_snapshot(record)?;
        }
        Ok(())
    }

    pub fn insert_detail(&mut self, record: &DetailRecord) -> Result<()> {
        self.store.insert_detail(record)
    }

    pub fn update_price(&mut self, key: &ListingKey, price: i64) -> Result<()> {
        self.store.update_price(key, price)
    }

    /// Flush the log and hand back the store.
    pub fn finish(self) -> Result<S> {
        if let Some(log) = self.log {
            log.close()?;
        }
        Ok(self.store)
    }
}
