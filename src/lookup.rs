//! Resolving a pair against the current rate table

use crate::core::calendar::business_day;
use crate::core::clock::Clock;
use crate::core::currency::{CodeError, CurrencyCode, CurrencyPair, CurrencyTable};
use crate::store::{HistoryStore, StoreError};
use crate::sync::{RefreshCoordinator, TriggerError, TriggerOutcome};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    InvalidCode(#[from] CodeError),
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(CurrencyCode),
    #[error("The quote currency rate for {0} is 0; division by zero is not allowed")]
    ZeroQuoteRate(CurrencyPair),
    #[error("Failed to save rate: {0}")]
    Store(#[from] StoreError),
    #[error("Failed to schedule history refresh: {0}")]
    Trigger(#[from] TriggerError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairQuote {
    pub pair: CurrencyPair,
    pub rate: f64,
    pub date: NaiveDate,
    pub refresh: TriggerOutcome,
}

/// Answers "what is BASE in QUOTE right now", records the answer and asks for
/// the pair's history to be refreshed.
pub struct RateLookup {
    table: CurrencyTable,
    store: Arc<dyn HistoryStore>,
    coordinator: RefreshCoordinator,
    clock: Arc<dyn Clock>,
}

impl RateLookup {
    pub fn new(
        table: CurrencyTable,
        store: Arc<dyn HistoryStore>,
        coordinator: RefreshCoordinator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table,
            store,
            coordinator,
            clock,
        }
    }

    fn rate_of(&self, code: &CurrencyCode) -> Result<f64, LookupError> {
        self.table
            .rate(code)
            .ok_or_else(|| LookupError::UnknownCurrency(code.clone()))
    }

    pub async fn lookup(&self, base: &str, quote: &str) -> Result<PairQuote, LookupError> {
        let pair = CurrencyPair::new(base.parse()?, quote.parse()?);
        let base_rate = self.rate_of(pair.base())?;
        let quote_rate = self.rate_of(pair.quote())?;
        if quote_rate == 0.0 {
            return Err(LookupError::ZeroQuoteRate(pair));
        }

        let rate = base_rate / quote_rate;
        let date = business_day(self.clock.today());
        let outcome = self.store.upsert(&pair, date, rate).await?;
        debug!(%pair, %date, rate, ?outcome, "Saved current rate");

        let refresh = self.coordinator.trigger(&pair).await?;
        Ok(PairQuote {
            pair,
            rate,
            date,
            refresh,
        })
    }
}
