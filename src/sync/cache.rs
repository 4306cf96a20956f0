use crate::core::currency::CurrencyCode;
use crate::core::series::{FetchError, RateFetcher, RateSeries};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Series fetched during one synchronization run, keyed by currency code.
///
/// Created at the start of a run and dropped at its end; nothing survives
/// into the next run. Failed fetches are not remembered.
pub struct SeriesCache<'a> {
    fetcher: &'a dyn RateFetcher,
    start: NaiveDate,
    end: NaiveDate,
    series: HashMap<CurrencyCode, Arc<RateSeries>>,
}

impl<'a> SeriesCache<'a> {
    pub fn new(fetcher: &'a dyn RateFetcher, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            fetcher,
            start,
            end,
            series: HashMap::new(),
        }
    }

    /// A code that follows another currency's calendar is derived from that
    /// currency's cached series, so the anchor is fetched at most once.
    pub async fn get(&mut self, code: &CurrencyCode) -> Result<Arc<RateSeries>, FetchError> {
        let Some(anchor) = self.fetcher.calendar_anchor(code) else {
            return self.fetch_once(code).await;
        };
        if let Some(series) = self.series.get(code) {
            debug!("Cache hit for series: {}", code);
            return Ok(Arc::clone(series));
        }
        debug!("Deriving {} from the {} calendar", code, anchor);
        let anchor_series = self.fetch_once(&anchor).await?;
        let series = Arc::new(anchor_series.with_constant_rate(1.0));
        self.series.insert(code.clone(), Arc::clone(&series));
        Ok(series)
    }

    async fn fetch_once(&mut self, code: &CurrencyCode) -> Result<Arc<RateSeries>, FetchError> {
        if let Some(series) = self.series.get(code) {
            debug!("Cache hit for series: {}", code);
            return Ok(Arc::clone(series));
        }
        debug!("Cache miss for series: {}", code);
        let series = Arc::new(
            self.fetcher
                .fetch_series(code, self.start, self.end)
                .await?,
        );
        self.series.insert(code.clone(), Arc::clone(&series));
        Ok(series)
    }

    /// Number of distinct codes resolved so far.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.series.contains_key(code)
    }
}
