//! Core domain types and abstractions

pub mod calendar;
pub mod clock;
pub mod config;
pub mod currency;
pub mod log;
pub mod merge;
pub mod series;

// Re-export main types for cleaner imports
pub use clock::{Clock, ManualClock, SystemClock};
pub use currency::{CurrencyCode, CurrencyPair, CurrencyTable};
pub use series::{FetchError, FetchReason, RateFetcher, RateSeries};
