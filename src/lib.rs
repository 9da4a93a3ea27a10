pub mod api;
pub mod auth;
pub mod commands;
pub mod data;
pub mod engine;
pub mod errors;
pub mod models;
pub mod utils;

use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::errors::AppError;
use crate::models::config::AppConfig;

/// Shared application state: the store handle plus configuration.
///
/// Opened once at startup and handed to every component that touches the
/// database. `close` consumes the state, so it can only run after every
/// borrower (scheduler, request handlers) is gone.
pub struct AppState {
    pub db: Mutex<Connection>,
    pub config: AppConfig,
}

impl AppState {
    /// Open the database named by `config.db_path`.
    pub fn open(config: AppConfig) -> Result<Self, AppError> {
        let conn = data::storage::initialize_database(&config.db_path)?;
        Ok(Self::with_connection(config, conn))
    }

    pub fn with_connection(config: AppConfig, conn: Connection) -> Self {
        AppState {
            db: Mutex::new(conn),
            config,
        }
    }

    pub fn close(self) -> Result<(), AppError> {
        self.db
            .into_inner()
            .close()
            .map_err(|(_, e)| AppError::from(e))?;
        info!("Database connection closed");
        Ok(())
    }
}

/// Install the global `tracing` subscriber; `RUST_LOG` overrides `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
