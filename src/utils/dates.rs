use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::AppError;

/// Hour of day every "current" date is pinned to.
///
/// Midnight local time shifts into the previous UTC day after a CET/CEST
/// switch; 13:00 stays on the same calendar day in both offsets.
pub const ANCHOR_HOUR: u32 = 13;

/// Format a date as `YYYY-MM-DD`, the storage key and the `date=` query value.
pub fn date_to_key_string<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Parse a `YYYY-MM-DD` key back into a calendar date.
pub fn parse_key_string(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::InvalidDate(format!("'{}': {}", s, e)))
}

/// URL of the page publishing market data for `date`.
pub fn date_to_source_locator<D: Datelike>(base_url: &str, date: &D) -> String {
    format!("{}?date={}", base_url, date_to_key_string(date))
}

/// Absolute difference between two dates in whole days.
pub fn day_difference(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// `date` at the anchor hour.
pub fn at_anchor_hour(date: NaiveDate) -> NaiveDateTime {
    date.and_time(anchor_time())
}

/// Today (local calendar) at the anchor hour.
pub fn today_at_anchor_hour() -> NaiveDateTime {
    at_anchor_hour(Local::now().date_naive())
}

/// Tomorrow (local calendar) at the anchor hour.
pub fn tomorrow_at_anchor_hour() -> NaiveDateTime {
    tomorrow_at_anchor_hour_from(Local::now().naive_local())
}

pub fn tomorrow_at_anchor_hour_from(now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    let tomorrow = today.succ_opt().unwrap_or(today);
    at_anchor_hour(tomorrow)
}

fn anchor_time() -> NaiveTime {
    NaiveTime::from_hms_opt(ANCHOR_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}
