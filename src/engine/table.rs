use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::day::{HourRow, MAX_HOURS_PER_DAY};

/// The page renders two `report_table` tables; the first one is a summary.
const REPORT_TBODY: &str = ".report_table tbody";
const REPORT_TABLE_INDEX: usize = 1;

/// Extract hour rows from an OTE daily market page.
///
/// Rows whose header label is not `position + 1` are skipped (the source may
/// omit hours). Cells that do not parse become `None`. Fails only when the
/// market table itself is absent.
pub fn parse_report_table(html: &str) -> Result<Vec<HourRow>, AppError> {
    let document = Html::parse_document(html);
    let tbody_sel = selector(REPORT_TBODY)?;
    let tr_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;

    let table = document
        .select(&tbody_sel)
        .nth(REPORT_TABLE_INDEX)
        .ok_or_else(|| AppError::Parse("market data table not found".to_string()))?;

    let mut rows = Vec::new();
    for (i, tr) in table.select(&tr_sel).enumerate().take(MAX_HOURS_PER_DAY) {
        let label_text: String = tr.select(&th_sel).map(|th| element_text(&th)).collect();
        let expected = (i + 1) as u32;
        match parse_hour_label(&label_text) {
            Some(label) if label == expected => {
                let values = tr
                    .select(&td_sel)
                    .map(|td| parse_cell(&element_text(&td)))
                    .collect();
                rows.push(HourRow { index: i, label, values });
            }
            _ => {
                warn!("No data to scrape for hour {} (row label '{}')", expected, label_text.trim());
            }
        }
    }

    info!("{} rows scraped", rows.len());
    Ok(rows)
}

/// Parse a locale-formatted number such as `"1 234,5"` or `"-12,80"`.
///
/// Any whitespace (including no-break spaces) is a thousands separator and the
/// first comma is the decimal point. Anything else, `"-"` and `""` included,
/// is missing.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    compact
        .replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Leading decimal digits of the row header, e.g. `"7"` or `"7."` → 7.
fn parse_hour_label(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect()
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::Parse(format!("bad selector '{}': {:?}", css, e)))
}
