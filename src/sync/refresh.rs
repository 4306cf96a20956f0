use super::cache::SeriesCache;
use crate::core::calendar::sync_window;
use crate::core::clock::Clock;
use crate::core::config::FailurePolicy;
use crate::core::currency::CurrencyPair;
use crate::core::merge::{merge, zero_divisor};
use crate::core::series::{FetchError, RateFetcher};
use crate::store::{HistoryStore, StoreError, UpsertOutcome};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Failed to list known pairs: {0}")]
    Pairs(#[source] StoreError),
    #[error("Failed to fetch series for {pair}: {source}")]
    Fetch {
        pair: CurrencyPair,
        source: FetchError,
    },
    #[error("Quote rate for {pair} is zero on {date}")]
    ZeroQuoteRate { pair: CurrencyPair, date: NaiveDate },
    #[error("Failed to store {pair}: {source}")]
    Store {
        pair: CurrencyPair,
        source: StoreError,
    },
}

/// Summary of one batch refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pairs_refreshed: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub series_fetched: usize,
    pub failed: Vec<(CurrencyPair, String)>,
}

impl RefreshReport {
    fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            pairs_refreshed: 0,
            inserted: 0,
            already_present: 0,
            series_fetched: 0,
            failed: Vec::new(),
        }
    }
}

/// Recomputes the recent history of every known pair.
///
/// Known pairs are those already in the store plus any configured ones. Each
/// run gets its own [`SeriesCache`], so a currency shared by several pairs is
/// fetched once per run.
pub struct BatchRefresh {
    fetcher: Arc<dyn RateFetcher>,
    store: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    window_days: u32,
    policy: FailurePolicy,
    pairs: Vec<CurrencyPair>,
}

impl BatchRefresh {
    pub fn new(
        fetcher: Arc<dyn RateFetcher>,
        store: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock,
            window_days: 30,
            policy: FailurePolicy::default(),
            pairs: Vec::new(),
        }
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pairs refreshed even when the store has no record of them yet.
    pub fn with_pairs(mut self, pairs: Vec<CurrencyPair>) -> Self {
        self.pairs = pairs;
        self
    }

    async fn known_pairs(&self) -> Result<Vec<CurrencyPair>, RefreshError> {
        let mut pairs: BTreeSet<CurrencyPair> = self
            .store
            .pairs()
            .await
            .map_err(RefreshError::Pairs)?
            .into_iter()
            .collect();
        pairs.extend(self.pairs.iter().cloned());
        Ok(pairs.into_iter().collect())
    }

    pub async fn run(&self) -> Result<RefreshReport, RefreshError> {
        let pairs = self.known_pairs().await?;
        let (start, end) = sync_window(self.clock.today(), self.window_days);
        info!(pairs = pairs.len(), %start, %end, "Starting batch refresh");

        let mut cache = SeriesCache::new(self.fetcher.as_ref(), start, end);
        let mut report = RefreshReport::new(start, end);

        for pair in &pairs {
            match self.refresh_pair(&mut cache, pair, &mut report).await {
                Ok(()) => report.pairs_refreshed += 1,
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        error!(
                            error = %e,
                            refreshed = report.pairs_refreshed,
                            "Batch refresh aborted"
                        );
                        return Err(e);
                    }
                    FailurePolicy::Isolate => {
                        warn!(error = %e, %pair, "Skipping pair");
                        report.failed.push((pair.clone(), e.to_string()));
                    }
                },
            }
        }

        report.series_fetched = cache.len();
        info!(
            refreshed = report.pairs_refreshed,
            inserted = report.inserted,
            already_present = report.already_present,
            failed = report.failed.len(),
            "Batch refresh finished"
        );
        Ok(report)
    }

    async fn refresh_pair(
        &self,
        cache: &mut SeriesCache<'_>,
        pair: &CurrencyPair,
        report: &mut RefreshReport,
    ) -> Result<(), RefreshError> {
        let fetch_err = |source| RefreshError::Fetch {
            pair: pair.clone(),
            source,
        };
        let base = cache.get(pair.base()).await.map_err(fetch_err)?;
        let quote = cache.get(pair.quote()).await.map_err(fetch_err)?;

        if let Some(date) = zero_divisor(&base, &quote) {
            return Err(RefreshError::ZeroQuoteRate {
                pair: pair.clone(),
                date,
            });
        }

        for (date, rate) in merge(&base, &quote) {
            let outcome = self
                .store
                .upsert(pair, date, rate)
                .await
                .map_err(|source| RefreshError::Store {
                    pair: pair.clone(),
                    source,
                })?;
            match outcome {
                UpsertOutcome::Inserted => report.inserted += 1,
                UpsertOutcome::AlreadyPresent => report.already_present += 1,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::store::MemoryHistoryStore;
    use crate::sync::test_support::{MockFetcher, dec};
    use chrono::{TimeZone, Utc};

    fn pair(symbol: &str) -> CurrencyPair {
        symbol.parse().unwrap()
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 12, 6, 12, 0, 0).unwrap(),
        ))
    }

    fn market() -> MockFetcher {
        MockFetcher::new()
            .with_series("EUR", &[(2, 4.30), (3, 4.28), (4, 4.25)])
            .with_series("USD", &[(2, 4.00), (3, 4.10), (5, 4.05)])
            .with_series("PLN", &[(2, 1.0), (3, 1.0), (4, 1.0)])
    }

    #[tokio::test]
    async fn test_refreshes_every_known_pair() {
        let fetcher = Arc::new(market());
        let store = Arc::new(MemoryHistoryStore::new());
        store.upsert(&pair("EURUSD"), dec(6), 1.07).await.unwrap();
        store.upsert(&pair("USDPLN"), dec(6), 4.02).await.unwrap();

        let report = BatchRefresh::new(fetcher.clone(), store.clone(), clock())
            .with_pairs(vec![pair("EURPLN")])
            .run()
            .await
            .unwrap();

        assert_eq!(report.pairs_refreshed, 3);
        assert_eq!(report.start, dec(6) - chrono::Duration::days(30));
        assert_eq!(report.end, dec(6));
        // Each currency is fetched once even though each appears in two pairs
        assert_eq!(fetcher.calls("EUR"), 1);
        assert_eq!(fetcher.calls("USD"), 1);
        assert_eq!(fetcher.calls("PLN"), 1);
        assert_eq!(report.series_fetched, 3);

        let eurusd = store.history(&pair("EURUSD")).await.unwrap();
        assert_eq!(
            eurusd.iter().map(|r| (r.date, r.rate)).collect::<Vec<_>>(),
            vec![(dec(2), 4.30 / 4.00), (dec(3), 4.28 / 4.10), (dec(6), 1.07)]
        );
        let eurpln = store.history(&pair("EURPLN")).await.unwrap();
        assert_eq!(eurpln.len(), 3);
        assert_eq!(report.inserted, 2 + 2 + 3);
    }

    #[tokio::test]
    async fn test_existing_records_are_kept() {
        let fetcher = Arc::new(market());
        let store = Arc::new(MemoryHistoryStore::new());
        store.upsert(&pair("EURUSD"), dec(2), 9.99).await.unwrap();

        let report = BatchRefresh::new(fetcher, store.clone(), clock())
            .run()
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.already_present, 1);
        let record = store.get(&pair("EURUSD"), dec(2)).await.unwrap().unwrap();
        assert_eq!(record.rate, 9.99);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_first_failure() {
        let fetcher = Arc::new(market().with_status("CHF", 500));
        let store = Arc::new(MemoryHistoryStore::new());
        // Pairs run in symbol order
        let refresh = BatchRefresh::new(fetcher.clone(), store.clone(), clock())
            .with_pairs(vec![pair("AUDPLN"), pair("CHFPLN"), pair("EURUSD")])
            .with_policy(FailurePolicy::Abort);

        let err = refresh.run().await.unwrap_err();

        // AUD has no canned series, so the first pair already fails
        assert!(matches!(
            err,
            RefreshError::Fetch { ref pair, source: FetchError::HttpStatus { status: 404, .. } }
                if pair.symbol() == "AUDPLN"
        ));
        assert_eq!(fetcher.calls("CHF"), 0);
        assert_eq!(fetcher.calls("EUR"), 0);
        assert!(store.pairs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abort_policy_keeps_earlier_pairs() {
        let fetcher = Arc::new(market().with_status("GBP", 503));
        let store = Arc::new(MemoryHistoryStore::new());

        let err = BatchRefresh::new(fetcher.clone(), store.clone(), clock())
            .with_pairs(vec![pair("EURUSD"), pair("GBPPLN"), pair("USDPLN")])
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, RefreshError::Fetch { ref pair, .. } if pair.symbol() == "GBPPLN"));
        assert_eq!(store.history(&pair("EURUSD")).await.unwrap().len(), 2);
        assert!(store.history(&pair("USDPLN")).await.unwrap().is_empty());
        assert_eq!(fetcher.calls("PLN"), 0);
    }

    #[tokio::test]
    async fn test_isolate_policy_continues() {
        let fetcher = Arc::new(market().with_status("GBP", 503));
        let store = Arc::new(MemoryHistoryStore::new());

        let report = BatchRefresh::new(fetcher, store.clone(), clock())
            .with_pairs(vec![pair("EURUSD"), pair("GBPPLN"), pair("USDPLN")])
            .with_policy(FailurePolicy::Isolate)
            .run()
            .await
            .unwrap();

        assert_eq!(report.pairs_refreshed, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, pair("GBPPLN"));
        assert_eq!(store.history(&pair("USDPLN")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_quote_rate_is_rejected_before_merge() {
        let fetcher = Arc::new(market().with_series("JPY", &[(2, 0.0), (3, 0.027)]));
        let store = Arc::new(MemoryHistoryStore::new());

        let report = BatchRefresh::new(fetcher, store.clone(), clock())
            .with_pairs(vec![pair("USDJPY"), pair("JPYUSD")])
            .with_policy(FailurePolicy::Isolate)
            .run()
            .await
            .unwrap();

        // JPY as base is fine; as quote it would divide by zero on Dec 2
        assert_eq!(report.pairs_refreshed, 1);
        assert_eq!(report.failed[0].0, pair("USDJPY"));
        assert!(report.failed[0].1.contains("zero"));
        assert!(store.history(&pair("USDJPY")).await.unwrap().is_empty());
        assert_eq!(store.history(&pair("JPYUSD")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_pairs_no_fetches() {
        let fetcher = Arc::new(market());
        let store = Arc::new(MemoryHistoryStore::new());

        let report = BatchRefresh::new(fetcher.clone(), store, clock())
            .run()
            .await
            .unwrap();

        assert_eq!(report.pairs_refreshed, 0);
        assert_eq!(fetcher.total_calls(), 0);
    }
}
