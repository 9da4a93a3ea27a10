use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tracing::{error, info};

use crate::utils::dates::{today_at_anchor_hour, tomorrow_at_anchor_hour};
use crate::AppState;

use super::pipeline::scrape_and_store;
use super::source::MarketSource;

/// First `hour:00` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// The date a scheduled run scrapes.
pub fn scheduled_target(scrape_tomorrow: bool) -> NaiveDate {
    if scrape_tomorrow {
        tomorrow_at_anchor_hour().date()
    } else {
        today_at_anchor_hour().date()
    }
}

/// Run the pipeline once a day at `config.scrape_hour` local time.
///
/// Each run is awaited before the next one is scheduled, so there is never
/// more than one scrape in flight. Terminal errors are logged, not raised.
pub async fn run_daily(state: Arc<AppState>, source: Arc<dyn MarketSource>) {
    let hour = state.config.scrape_hour;
    loop {
        let now = Local::now();
        let next = next_run_after(now.naive_local(), hour);
        let wait = Local
            .from_local_datetime(&next)
            .earliest()
            .and_then(|n| (n - now).to_std().ok())
            .unwrap_or_default();
        info!("Next scrape scheduled at {}", next);
        tokio::time::sleep(wait).await;

        let date = scheduled_target(state.config.scrape_tomorrow);
        if let Err(e) = scrape_and_store(&state, &*source, date).await {
            error!("Error while scraping the data and storing them in DB for the date {}: {}", date, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(next_run_after(at(2025, 1, 9, 8, 30), 12), at(2025, 1, 9, 12, 0));
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        assert_eq!(next_run_after(at(2025, 1, 9, 12, 0), 12), at(2025, 1, 10, 12, 0));
        assert_eq!(next_run_after(at(2024, 12, 31, 18, 5), 12), at(2025, 1, 1, 12, 0));
    }

    #[test]
    fn test_scheduled_target_offsets() {
        let today = scheduled_target(false);
        let tomorrow = scheduled_target(true);
        assert!(tomorrow > today);
    }
}
