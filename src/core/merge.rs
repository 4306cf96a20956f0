//! Cross-rate derivation from two reference-unit series

use super::series::RateSeries;
use chrono::NaiveDate;

/// Derives the `base/quote` cross rate for every date both series share.
///
/// Dates present in only one series are dropped; nothing is interpolated or
/// carried forward. The output is ordered by date.
///
/// The caller must guarantee that `quote` has no zero rate on a shared date.
pub fn merge(base: &RateSeries, quote: &RateSeries) -> Vec<(NaiveDate, f64)> {
    base.iter()
        .filter_map(|(date, base_rate)| {
            quote
                .get(date)
                .map(|quote_rate| (*date, base_rate / quote_rate))
        })
        .collect()
}

/// First shared date on which `quote` is zero, if any.
pub fn zero_divisor(base: &RateSeries, quote: &RateSeries) -> Option<NaiveDate> {
    quote
        .iter()
        .find(|(date, rate)| *rate == 0.0 && base.get(date).is_some())
        .map(|(date, _)| *date)
}
