use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::dates::date_to_key_string;

/// Row counts accepted as a complete day (23 and 25 cover the DST switch days).
pub const MIN_HOURS_PER_DAY: usize = 23;
pub const MAX_HOURS_PER_DAY: usize = 25;

/// One row of the published market table, nominally one delivery hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRow {
    /// Zero-based position of the row in the source table.
    pub index: usize,
    /// Hour label read from the row header; `index + 1` for every accepted row.
    pub label: u32,
    /// Price, volume, balance, export, import. `None` marks a missing cell.
    pub values: Vec<Option<f64>>,
}

impl HourRow {
    /// Flatten into the `[index, ...values]` shape served by the read API.
    pub fn market_row(&self) -> Value {
        let mut row = Vec::with_capacity(self.values.len() + 1);
        row.push(Value::from(self.index));
        for v in &self.values {
            row.push(
                v.and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            );
        }
        Value::Array(row)
    }
}

/// The persisted unit: all hours of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub hours: Vec<HourRow>,
    pub scraped_at: String,
}

impl DayRecord {
    pub fn new(date: NaiveDate, hours: Vec<HourRow>) -> Self {
        Self {
            date,
            hours,
            scraped_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Serialize as `{date, marketData}` for API consumers.
    pub fn to_market_json(&self) -> Value {
        serde_json::json!({
            "date": date_to_key_string(&self.date),
            "marketData": self.hours.iter().map(HourRow::market_row).collect::<Vec<_>>(),
        })
    }
}

/// Whether a scraped row count falls inside the acceptance window.
pub fn is_complete_day(row_count: usize) -> bool {
    (MIN_HOURS_PER_DAY..=MAX_HOURS_PER_DAY).contains(&row_count)
}
