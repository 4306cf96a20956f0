//! Rate series and the fetcher abstraction

use super::currency::{CurrencyCode, CurrencyTable};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use thiserror::Error;

/// Why a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    Network,
    HttpStatus,
    Decode,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error for {code}: {source}")]
    Network {
        code: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error: {status} for {code}")]
    HttpStatus { code: String, status: u16 },
    #[error("Failed to decode response for {code}: {message}")]
    Decode { code: String, message: String },
}

impl FetchError {
    pub fn decode(code: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Decode {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn reason(&self) -> FetchReason {
        match self {
            FetchError::Network { .. } => FetchReason::Network,
            FetchError::HttpStatus { .. } => FetchReason::HttpStatus,
            FetchError::Decode { .. } => FetchReason::Decode,
        }
    }

    /// Only transport failures are worth another attempt; a bad status or a
    /// malformed payload will not change on retry.
    pub fn is_retryable(&self) -> bool {
        self.reason() == FetchReason::Network
    }
}

/// Daily rates of one currency against the reference unit, ordered by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl RateSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series, rejecting duplicate dates and negative rates.
    pub fn from_points<I>(points: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut series = Self::new();
        for (date, rate) in points {
            if !rate.is_finite() || rate < 0.0 {
                return Err(format!("invalid rate {rate} on {date}"));
            }
            match series.points.entry(date) {
                Entry::Occupied(_) => return Err(format!("duplicate date {date}")),
                Entry::Vacant(slot) => {
                    slot.insert(rate);
                }
            }
        }
        Ok(series)
    }

    /// Same calendar as `self`, every rate replaced by `rate`.
    pub fn with_constant_rate(&self, rate: f64) -> Self {
        Self {
            points: self.points.keys().map(|date| (*date, rate)).collect(),
        }
    }

    pub fn get(&self, date: &NaiveDate) -> Option<f64> {
        self.points.get(date).copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.points.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, f64)> {
        self.points.iter().map(|(date, rate)| (date, *rate))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch_series(
        &self,
        code: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeries, FetchError>;

    async fn fetch_table(&self, date: NaiveDate) -> Result<CurrencyTable, FetchError>;

    /// The currency whose trading days `code` follows at a constant rate of
    /// 1.0, when `code` has no series of its own.
    fn calendar_anchor(&self, _code: &CurrencyCode) -> Option<CurrencyCode> {
        None
    }
}
