pub mod disk;
pub mod memory;

use crate::core::currency::CurrencyPair;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use disk::FjallHistoryStore;
pub use memory::{MemoryHistoryStore, MemoryLockStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] fjall::Error),
    #[error("Failed to encode record: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Corrupt record key: {0}")]
    CorruptKey(String),
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock store unavailable: {0}")]
    Unavailable(String),
}

/// One persisted cross rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub pair: CurrencyPair,
    pub date: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// A record for the key already existed and was left untouched.
    AlreadyPresent,
}

/// Write-once store of `(pair, date) -> rate` records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Creates the record if no record exists for `(pair, date)`. An existing
    /// record keeps its rate even when `rate` differs.
    async fn upsert(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
        rate: f64,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn get(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
    ) -> Result<Option<RateRecord>, StoreError>;

    /// All records for `pair`, oldest first.
    async fn history(&self, pair: &CurrencyPair) -> Result<Vec<RateRecord>, StoreError>;

    /// Every pair with at least one record, ordered by symbol.
    async fn pairs(&self) -> Result<Vec<CurrencyPair>, StoreError>;
}

/// Keyed flags that expire on their own.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically sets `key` for `ttl` unless it is already set and unexpired.
    /// Returns whether this call took the lock.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool, LockError>;
}
