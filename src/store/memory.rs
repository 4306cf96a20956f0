use super::{HistoryStore, LockError, LockStore, RateRecord, StoreError, UpsertOutcome};
use crate::core::clock::{Clock, SystemClock};
use crate::core::currency::CurrencyPair;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory history store keyed by `(pair, date)`
#[derive(Default)]
pub struct MemoryHistoryStore {
    inner: Mutex<BTreeMap<(CurrencyPair, NaiveDate), f64>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn upsert(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
        rate: f64,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut records = self.inner.lock().await;
        match records.entry((pair.clone(), date)) {
            Entry::Occupied(_) => {
                debug!(%pair, %date, "Record already present");
                Ok(UpsertOutcome::AlreadyPresent)
            }
            Entry::Vacant(slot) => {
                slot.insert(rate);
                debug!(%pair, %date, rate, "Record inserted");
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn get(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
    ) -> Result<Option<RateRecord>, StoreError> {
        let records = self.inner.lock().await;
        Ok(records
            .get(&(pair.clone(), date))
            .map(|rate| RateRecord {
                pair: pair.clone(),
                date,
                rate: *rate,
            }))
    }

    async fn history(&self, pair: &CurrencyPair) -> Result<Vec<RateRecord>, StoreError> {
        let records = self.inner.lock().await;
        Ok(records
            .iter()
            .filter(|((p, _), _)| p == pair)
            .map(|((p, date), rate)| RateRecord {
                pair: p.clone(),
                date: *date,
                rate: *rate,
            })
            .collect())
    }

    async fn pairs(&self) -> Result<Vec<CurrencyPair>, StoreError> {
        let records = self.inner.lock().await;
        let pairs: BTreeSet<_> = records.keys().map(|(pair, _)| pair.clone()).collect();
        Ok(pairs.into_iter().collect())
    }
}

/// In-memory TTL locks; expiry is judged against the injected clock.
pub struct MemoryLockStore {
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryLockStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryLockStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool, LockError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| LockError::Unavailable(format!("invalid ttl for {key}: {e}")))?;

        let mut locks = self.locks.lock().await;
        let now = self.clock.now();
        if let Some(expires_at) = locks.get(key) {
            if *expires_at > now {
                debug!(key, "Lock held");
                return Ok(false);
            }
            debug!(key, "Lock expired");
        }
        locks.insert(key.to_string(), now + ttl);
        debug!(key, "Lock acquired");
        Ok(true)
    }
}
