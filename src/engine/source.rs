use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::day::HourRow;
use crate::utils::dates::date_to_source_locator;

use super::table::parse_report_table;

/// Anything that can hand back the raw HTML behind a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, AppError>;
}

#[async_trait]
impl<P: PageSource + ?Sized> PageSource for Arc<P> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        (**self).fetch(url).await
    }
}

/// Plain HTTP GET via `reqwest`; non-2xx responses are transport errors.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ote-scraper/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!("{} returned status {}", url, status)));
        }
        Ok(resp.text().await?)
    }
}

/// One extraction attempt for a calendar date.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn hour_rows(&self, date: NaiveDate) -> Result<Vec<HourRow>, AppError>;
}

/// Fetches the OTE page for a date and runs it through the table adapter.
pub struct OteMarketSource<P> {
    base_url: String,
    pages: P,
}

impl<P: PageSource> OteMarketSource<P> {
    pub fn new(base_url: impl Into<String>, pages: P) -> Self {
        Self {
            base_url: base_url.into(),
            pages,
        }
    }
}

#[async_trait]
impl<P: PageSource> MarketSource for OteMarketSource<P> {
    async fn hour_rows(&self, date: NaiveDate) -> Result<Vec<HourRow>, AppError> {
        let url = date_to_source_locator(&self.base_url, &date);
        info!("Scrape URL: {}", url);
        let html = self.pages.fetch(&url).await?;
        parse_report_table(&html)
    }
}
