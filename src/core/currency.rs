//! Currency codes, pair symbols and the current rate table

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// The fixed reference unit every quoted rate is expressed in.
pub const REFERENCE_CURRENCY: &str = "PLN";

/// Liquid currency whose trading calendar stands in for the reference unit's.
pub const DEFAULT_ANCHOR_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("Invalid currency code: {0:?}")]
    InvalidCode(String),
    #[error("Invalid currency pair: {0:?}")]
    InvalidPair(String),
}

/// Three-letter uppercase currency identifier, e.g. `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn reference() -> Self {
        Self(REFERENCE_CURRENCY.to_string())
    }

    pub fn default_anchor() -> Self {
        Self(DEFAULT_ANCHOR_CURRENCY.to_string())
    }

    pub fn is_reference(&self) -> bool {
        self.0 == REFERENCE_CURRENCY
    }
}

impl FromStr for CurrencyCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(CodeError::InvalidCode(s.to_string()))
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A base/quote pair. Its symbol is the two codes concatenated, e.g. `EURUSD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    base: CurrencyCode,
    quote: CurrencyCode,
}

impl CurrencyPair {
    pub fn new(base: CurrencyCode, quote: CurrencyCode) -> Self {
        Self { base, quote }
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn quote(&self) -> &CurrencyCode {
        &self.quote
    }

    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim();
        if symbol.len() != 6 || !symbol.is_ascii() {
            return Err(CodeError::InvalidPair(s.to_string()));
        }
        let (base, quote) = symbol.split_at(3);
        let base = base
            .parse()
            .map_err(|_| CodeError::InvalidPair(s.to_string()))?;
        let quote = quote
            .parse()
            .map_err(|_| CodeError::InvalidPair(s.to_string()))?;
        Ok(Self { base, quote })
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.symbol()
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

/// Current bid rates against the reference unit, as of one table date.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyTable {
    effective_date: NaiveDate,
    rates: BTreeMap<CurrencyCode, f64>,
}

impl CurrencyTable {
    /// Builds a table; the reference unit is always present at 1.0.
    pub fn new(effective_date: NaiveDate, rates: BTreeMap<CurrencyCode, f64>) -> Self {
        let mut rates = rates;
        rates.insert(CurrencyCode::reference(), 1.0);
        Self {
            effective_date,
            rates,
        }
    }

    pub fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    pub fn rate(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, f64)> {
        self.rates.iter().map(|(code, rate)| (code, *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
