use chrono::NaiveDate;
use serde::Serialize;

/// All application errors, categorized by domain.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Scraping ──
    #[error("Failed to download market page: {0}")]
    Transport(String),

    #[error("Failed to parse market page: {0}")]
    Parse(String),

    #[error("Scraping failed after {attempts} attempts for the date {date}")]
    ExhaustedRetries { date: NaiveDate, attempts: u32 },

    // ── Database ──
    #[error("Market data for {date} already stored")]
    DuplicateKey { date: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    // ── Input ──
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    // ── API access ──
    #[error("{0}")]
    Unauthorized(String),

    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Serialization ──
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── General ──
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors the retry driver absorbs as an empty attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::Parse(_))
    }
}

/// Serializable error body returned by the read API.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::Transport(_) => "TRANSPORT",
            AppError::Parse(_) => "PARSE",
            AppError::ExhaustedRetries { .. } => "EXHAUSTED_RETRIES",
            AppError::DuplicateKey { .. } => "DUPLICATE_KEY",
            AppError::Database(_) => "DATABASE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidDate(_) => "INVALID_DATE",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::Serialization(_) => "SERIALIZATION",
            AppError::Internal(_) => "INTERNAL",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
