use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::config::AppConfig;
use crate::models::day::{is_complete_day, HourRow};

use super::source::MarketSource;

/// Fixed-delay retry budget. The source publishes a day incrementally, so
/// polling at a steady interval is the intended recovery model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        RetryPolicy {
            max_attempts: config.retry_count.max(1),
            delay: config.retry_period,
        }
    }
}

/// Scrape `date` until the row count lands in the acceptance window.
///
/// Transport and parse failures count as an empty attempt. `sleep` is awaited
/// between failed attempts only, never after a success or the last attempt.
pub async fn fetch_with_retry<S, F, Fut>(
    source: &S,
    date: NaiveDate,
    policy: RetryPolicy,
    mut sleep: F,
) -> Result<Vec<HourRow>, AppError>
where
    S: MarketSource + ?Sized,
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    for attempt in 1..=policy.max_attempts {
        let rows = match source.hour_rows(date).await {
            Ok(rows) => rows,
            Err(e) if e.is_retryable() => {
                error!("Attempt {}/{} for {}: {}", attempt, policy.max_attempts, date, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        if is_complete_day(rows.len()) {
            info!("Accepted {} rows for {} on attempt {}", rows.len(), date, attempt);
            return Ok(rows);
        }

        warn!(
            "Something went wrong while scraping {}: got {} rows (attempt {}/{})",
            date,
            rows.len(),
            attempt,
            policy.max_attempts
        );
        if attempt < policy.max_attempts {
            sleep(policy.delay).await;
        }
    }

    Err(AppError::ExhaustedRetries {
        date,
        attempts: policy.max_attempts,
    })
}
