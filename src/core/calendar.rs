use chrono::{Datelike, Days, NaiveDate, Weekday};

/// The date itself, or the preceding Friday when it falls on a weekend.
pub fn business_day(date: NaiveDate) -> NaiveDate {
    let back = match date.weekday() {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => return date,
    };
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// The `(start, end)` window synchronized by a batch refresh: `days` calendar
/// days back from `today`, with both ends moved off weekends. A window
/// reaching past the calendar's first date starts there.
pub fn sync_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    (business_day(start), business_day(today))
}
