use std::net::SocketAddr;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::api;
use crate::auth;
use crate::data::storage;
use crate::engine::pipeline::{self, BackfillReport};
use crate::engine::retry::RetryPolicy;
use crate::engine::scheduler;
use crate::engine::source::{HttpPageSource, MarketSource, OteMarketSource};
use crate::errors::AppError;
use crate::models::config::AppConfig;
use crate::models::day::DayRecord;
use crate::AppState;

fn http_source(config: &AppConfig) -> Result<OteMarketSource<HttpPageSource>, AppError> {
    Ok(OteMarketSource::new(config.base_url.clone(), HttpPageSource::new()?))
}

// ── Scrape Commands ──

/// Scrape and store a single date.
pub async fn scrape(config: AppConfig, date: NaiveDate) -> Result<DayRecord, AppError> {
    let source = http_source(&config)?;
    let state = AppState::open(config)?;

    let result = pipeline::scrape_and_store(&state, &source, date).await;
    state.close()?;
    result
}

/// Scrape `days` consecutive dates starting at `start`.
pub async fn backfill(config: AppConfig, start: NaiveDate, days: u32) -> Result<BackfillReport, AppError> {
    let source = http_source(&config)?;
    let policy = RetryPolicy::from_config(&config);
    let state = AppState::open(config)?;

    let report = pipeline::backfill(&state, &source, start, days, policy, tokio::time::sleep).await;
    state.close()?;
    Ok(report)
}

// ── Key Commands ──

/// Issue a new API key. Returns the plain key; only its hash is stored.
pub async fn issue_api_key(config: AppConfig) -> Result<String, AppError> {
    let secret = config.require_hash_key()?.to_string();
    let state = AppState::open(config)?;

    let key = auth::generate_api_key();
    let hashed = auth::hash_api_key(&secret, &key)?;
    {
        let db = state.db.lock().await;
        storage::insert_api_key(&db, &hashed)?;
    }
    state.close()?;

    info!("The API key hashed ({}) and stored in the DB", hashed);
    Ok(key)
}

// ── Server ──

/// Run the read API and the daily scheduler until Ctrl+C.
///
/// After the server stops, the scheduler task is stopped and awaited before
/// the database is closed.
pub async fn serve(config: AppConfig) -> Result<(), AppError> {
    config.require_hash_key()?;
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| AppError::InvalidConfig(format!("bad bind address: {}", e)))?;

    let source: Arc<dyn MarketSource> = Arc::new(http_source(&config)?);
    let state = Arc::new(AppState::open(config)?);

    let scheduler_task = tokio::spawn(scheduler::run_daily(Arc::clone(&state), source));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("The OTE server has started, listening on http://{}", addr);
    axum::serve(listener, api::router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler_task.abort();
    if let Err(e) = scheduler_task.await {
        if !e.is_cancelled() {
            warn!("Scheduler task ended abnormally: {}", e);
        }
    }

    match Arc::try_unwrap(state) {
        Ok(state) => state.close(),
        Err(_) => {
            warn!("Database handle still shared at shutdown; leaving it to drop");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, gracefully stopping…");
}
