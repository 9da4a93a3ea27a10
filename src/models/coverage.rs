use chrono::NaiveDate;
use serde::Serialize;

use crate::utils::dates::{date_to_key_string, day_difference};

/// How much of the calendar between the first and last stored day is covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub start_date: String,
    pub end_date: String,
    /// Days from first to last stored date, both ends included.
    pub duration: i64,
    /// Number of stored records.
    pub coverage: i64,
    pub gap: i64,
}

impl Coverage {
    pub fn new(first: NaiveDate, last: NaiveDate, stored: i64) -> Self {
        let duration = day_difference(first, last) + 1;
        Coverage {
            start_date: date_to_key_string(&first),
            end_date: date_to_key_string(&last),
            duration,
            coverage: stored,
            gap: duration - stored,
        }
    }
}
