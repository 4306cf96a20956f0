//! Fakes shared by the sync tests

use crate::core::currency::{CurrencyCode, CurrencyTable};
use crate::core::series::{FetchError, RateFetcher, RateSeries};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

enum Canned {
    Series(RateSeries),
    Status(u16),
}

pub fn dec(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, day).unwrap()
}

/// Serves canned series keyed by code and counts calls per code.
#[derive(Default)]
pub struct MockFetcher {
    canned: HashMap<String, Canned>,
    anchors: HashMap<String, String>,
    calls: Mutex<HashMap<String, usize>>,
    last_window: Mutex<Option<(NaiveDate, NaiveDate)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points are `(day of December 2024, rate)`.
    pub fn with_series(mut self, code: &str, points: &[(u32, f64)]) -> Self {
        let series =
            RateSeries::from_points(points.iter().map(|(d, r)| (dec(*d), *r))).unwrap();
        self.canned.insert(code.to_string(), Canned::Series(series));
        self
    }

    pub fn with_status(mut self, code: &str, status: u16) -> Self {
        self.canned.insert(code.to_string(), Canned::Status(status));
        self
    }

    /// Makes `code` follow the calendar of `anchor`.
    pub fn with_anchor(mut self, code: &str, anchor: &str) -> Self {
        self.anchors.insert(code.to_string(), anchor.to_string());
        self
    }

    pub fn calls(&self, code: &str) -> usize {
        self.calls.lock().unwrap().get(code).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn last_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        *self.last_window.lock().unwrap()
    }
}

#[async_trait]
impl RateFetcher for MockFetcher {
    async fn fetch_series(
        &self,
        code: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeries, FetchError> {
        *self.calls.lock().unwrap().entry(code.to_string()).or_default() += 1;
        *self.last_window.lock().unwrap() = Some((start, end));
        match self.canned.get(code.as_str()) {
            Some(Canned::Series(series)) => Ok(series.clone()),
            Some(Canned::Status(status)) => Err(FetchError::HttpStatus {
                code: code.to_string(),
                status: *status,
            }),
            None => Err(FetchError::HttpStatus {
                code: code.to_string(),
                status: 404,
            }),
        }
    }

    async fn fetch_table(&self, date: NaiveDate) -> Result<CurrencyTable, FetchError> {
        Ok(CurrencyTable::new(date, BTreeMap::new()))
    }

    fn calendar_anchor(&self, code: &CurrencyCode) -> Option<CurrencyCode> {
        self.anchors.get(code.as_str()).and_then(|a| a.parse().ok())
    }
}
