use super::{HistoryStore, RateRecord, StoreError, UpsertOutcome};
use crate::core::clock::{Clock, SystemClock};
use crate::core::currency::CurrencyPair;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const HISTORY_PARTITION: &str = "history";

#[derive(Serialize, Deserialize)]
struct StoredRate {
    rate: f64,
    created_at: DateTime<Utc>,
}

/// History store backed by a fjall partition.
///
/// Keys are `{PAIR}:{YYYY-MM-DD}`, so a prefix scan over one pair yields its
/// records in date order.
pub struct FjallHistoryStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    clock: Arc<dyn Clock>,
    // serializes the read-then-insert of `upsert`
    write_lock: Mutex<()>,
}

impl FjallHistoryStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let keyspace = fjall::Config::new(path).open()?;
        let partition =
            keyspace.open_partition(HISTORY_PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened history store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        })
    }

    /// Clock used to stamp `created_at` on new records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn record_key(pair: &CurrencyPair, date: NaiveDate) -> String {
        format!("{pair}:{}", date.format("%Y-%m-%d"))
    }

    fn parse_key(key: &[u8]) -> Result<(CurrencyPair, NaiveDate), StoreError> {
        let corrupt = || StoreError::CorruptKey(String::from_utf8_lossy(key).into_owned());
        let key = std::str::from_utf8(key).map_err(|_| corrupt())?;
        let (pair, date) = key.split_once(':').ok_or_else(corrupt)?;
        let pair = pair.parse().map_err(|_| corrupt())?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| corrupt())?;
        Ok((pair, date))
    }
}

#[async_trait]
impl HistoryStore for FjallHistoryStore {
    async fn upsert(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
        rate: f64,
    ) -> Result<UpsertOutcome, StoreError> {
        let key = Self::record_key(pair, date);
        let _guard = self.write_lock.lock().await;

        if self.partition.get(key.as_str())?.is_some() {
            debug!(key, "Record already present");
            return Ok(UpsertOutcome::AlreadyPresent);
        }

        let value = serde_json::to_vec(&StoredRate {
            rate,
            created_at: self.clock.now(),
        })?;
        self.partition.insert(key.as_str(), value)?;
        self.keyspace.persist(PersistMode::SyncData)?;
        debug!(key, rate, "Record inserted");
        Ok(UpsertOutcome::Inserted)
    }

    async fn get(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
    ) -> Result<Option<RateRecord>, StoreError> {
        let key = Self::record_key(pair, date);
        match self.partition.get(key.as_str())? {
            Some(value) => {
                let stored: StoredRate = serde_json::from_slice(&value)?;
                Ok(Some(RateRecord {
                    pair: pair.clone(),
                    date,
                    rate: stored.rate,
                }))
            }
            None => Ok(None),
        }
    }

    async fn history(&self, pair: &CurrencyPair) -> Result<Vec<RateRecord>, StoreError> {
        let prefix = format!("{pair}:");
        let mut records = Vec::new();
        for item in self.partition.prefix(prefix.as_str()) {
            let (key, value) = item?;
            let (pair, date) = Self::parse_key(&key)?;
            let stored: StoredRate = serde_json::from_slice(&value)?;
            records.push(RateRecord {
                pair,
                date,
                rate: stored.rate,
            });
        }
        Ok(records)
    }

    async fn pairs(&self) -> Result<Vec<CurrencyPair>, StoreError> {
        let mut pairs = BTreeSet::new();
        for item in self.partition.iter() {
            let (key, _) = item?;
            let (pair, _) = Self::parse_key(&key)?;
            pairs.insert(pair);
        }
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn pair(symbol: &str) -> CurrencyPair {
        symbol.parse().unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    #[tokio::test]
    async fn test_fjall_upsert_is_write_once() {
        let dir = tempdir().unwrap();
        let store = FjallHistoryStore::open(dir.path()).unwrap();
        let eurusd = pair("EURUSD");

        assert_eq!(
            store.upsert(&eurusd, day(2), 1.05).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert(&eurusd, day(2), 1.10).await.unwrap(),
            UpsertOutcome::AlreadyPresent
        );
        assert_eq!(store.get(&eurusd, day(2)).await.unwrap().unwrap().rate, 1.05);
        assert!(store.get(&eurusd, day(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fjall_history_is_per_pair_and_ordered() {
        let dir = tempdir().unwrap();
        let store = FjallHistoryStore::open(dir.path()).unwrap();

        store.upsert(&pair("EURUSD"), day(10), 1.07).await.unwrap();
        store.upsert(&pair("EURUSD"), day(2), 1.05).await.unwrap();
        store.upsert(&pair("EURUSE"), day(2), 9.99).await.unwrap();
        store.upsert(&pair("CHFPLN"), day(2), 4.61).await.unwrap();

        let history = store.history(&pair("EURUSD")).await.unwrap();
        assert_eq!(
            history.iter().map(|r| (r.date, r.rate)).collect::<Vec<_>>(),
            vec![(day(2), 1.05), (day(10), 1.07)]
        );
        assert_eq!(
            store.pairs().await.unwrap(),
            vec![pair("CHFPLN"), pair("EURUSD"), pair("EURUSE")]
        );
    }

    #[tokio::test]
    async fn test_fjall_records_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FjallHistoryStore::open(dir.path()).unwrap();
            store.upsert(&pair("USDPLN"), day(2), 4.05).await.unwrap();
        }

        let store = FjallHistoryStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get(&pair("USDPLN"), day(2)).await.unwrap().unwrap().rate,
            4.05
        );
        assert_eq!(
            store.upsert(&pair("USDPLN"), day(2), 4.10).await.unwrap(),
            UpsertOutcome::AlreadyPresent
        );
    }

    #[tokio::test]
    async fn test_fjall_stamps_records_with_store_clock() {
        let dir = tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 12, 6, 14, 30, 0).unwrap();
        let clock = Arc::new(ManualClock::new(now));
        let store = FjallHistoryStore::open(dir.path())
            .unwrap()
            .with_clock(clock.clone());

        store.upsert(&pair("EURUSD"), day(6), 1.05).await.unwrap();
        clock.advance(chrono::Duration::hours(1));
        store.upsert(&pair("EURUSD"), day(6), 1.10).await.unwrap();

        let value = store.partition.get("EURUSD:2024-12-06").unwrap().unwrap();
        let stored: StoredRate = serde_json::from_slice(&value).unwrap();
        assert_eq!(stored.created_at, now);
        assert_eq!(stored.rate, 1.05);
    }
}
