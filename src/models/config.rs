use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

pub const DEFAULT_BASE_URL: &str = "https://www.ote-cr.cz/cs/kratkodobe-trhy/elektrina/denni-trh";

/// Runtime configuration read from `OTE_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Page the daily market table is published on; `?date=` is appended.
    pub base_url: String,
    pub db_path: PathBuf,

    // ── Read API ──
    pub bind: String,
    pub port: u16,
    /// Secret used to HMAC API keys. Empty ⇒ `serve` and `keygen` refuse to start.
    pub hash_key: String,

    // ── Retry driver ──
    pub retry_count: u32,
    pub retry_period: Duration,

    // ── Scheduler ──
    pub scrape_hour: u32,
    pub scrape_tomorrow: bool,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            db_path: PathBuf::from("./data/ote.db"),
            bind: "0.0.0.0".to_string(),
            port: 3000,
            hash_key: String::new(),
            retry_count: 30,
            retry_period: Duration::from_secs(10 * 60),
            scrape_hour: 12,
            scrape_tomorrow: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            base_url: env_str("OTE_BASE_URL", &defaults.base_url),
            db_path: PathBuf::from(env_str(
                "OTE_DB_PATH",
                defaults.db_path.to_str().unwrap_or("./data/ote.db"),
            )),
            bind: env_str("OTE_BIND", &defaults.bind),
            port: env_u16("OTE_BE_TUPLE_PORT", defaults.port),
            hash_key: env_str("OTE_HASH_KEY", ""),
            retry_count: env_u32("OTE_RETRY_COUNT", defaults.retry_count).max(1),
            retry_period: Duration::from_secs(env_u64(
                "OTE_RETRY_PERIOD_SECS",
                defaults.retry_period.as_secs(),
            )),
            scrape_hour: env_u32("OTE_SCRAPE_HOUR", defaults.scrape_hour).min(23),
            scrape_tomorrow: env_bool("OTE_SCRAPE_TOMORROW", defaults.scrape_tomorrow),
        }
    }

    /// The HMAC secret, or an error when it was never configured.
    pub fn require_hash_key(&self) -> Result<&str, AppError> {
        if self.hash_key.is_empty() {
            return Err(AppError::InvalidConfig(
                "OTE_HASH_KEY must be set to issue or verify API keys".to_string(),
            ));
        }
        Ok(&self.hash_key)
    }
}
