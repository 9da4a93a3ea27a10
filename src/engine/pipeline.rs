use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::data::storage;
use crate::errors::AppError;
use crate::models::day::DayRecord;
use crate::AppState;

use super::retry::{fetch_with_retry, RetryPolicy};
use super::source::MarketSource;

/// Scrape one day and store it, sleeping on the tokio timer between retries.
pub async fn scrape_and_store<S>(
    state: &AppState,
    source: &S,
    date: NaiveDate,
) -> Result<DayRecord, AppError>
where
    S: MarketSource + ?Sized,
{
    let policy = RetryPolicy::from_config(&state.config);
    scrape_and_store_with(state, source, date, policy, tokio::time::sleep).await
}

/// Same as [`scrape_and_store`] with an explicit retry policy and delay.
pub async fn scrape_and_store_with<S, F, Fut>(
    state: &AppState,
    source: &S,
    date: NaiveDate,
    policy: RetryPolicy,
    sleep: F,
) -> Result<DayRecord, AppError>
where
    S: MarketSource + ?Sized,
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    let hours = fetch_with_retry(source, date, policy, sleep).await?;
    let record = DayRecord::new(date, hours);

    let db = state.db.lock().await;
    storage::insert_day(&db, &record)?;
    info!("Stored {} hours of market data for {}", record.hours.len(), date);
    Ok(record)
}

/// Outcome of a day-stepping backfill.
#[derive(Debug, Default)]
pub struct BackfillReport {
    pub stored: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, AppError)>,
}

/// Scrape `days` consecutive dates starting at `start`, one after another.
///
/// A failure for one date is logged and recorded; the loop moves on.
pub async fn backfill<S, F, Fut>(
    state: &AppState,
    source: &S,
    start: NaiveDate,
    days: u32,
    policy: RetryPolicy,
    mut sleep: F,
) -> BackfillReport
where
    S: MarketSource + ?Sized,
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut report = BackfillReport::default();
    let mut date = start;

    for _ in 0..days {
        match scrape_and_store_with(state, source, date, policy, &mut sleep).await {
            Ok(_) => report.stored.push(date),
            Err(e) => {
                error!("Error while scraping the data and storing them in DB for the date {}: {}", date, e);
                report.failed.push((date, e));
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    info!(
        "Backfill done: {} stored, {} failed",
        report.stored.len(),
        report.failed.len()
    );
    report
}
