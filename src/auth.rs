use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info};

use crate::data::storage;
use crate::errors::AppError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const MSG_AUTH_HEADER_MISSING: &str = "Authorization header missing";
pub const MSG_KEY_NOT_AUTHORIZED: &str = "The API key used in the request is not authorized.";

/// Lowercase hex HMAC-SHA256 of an API key under the server secret.
pub fn hash_api_key(secret: &str, api_key: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(api_key.as_bytes());
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// A fresh random API key. Only its hash is ever stored.
pub fn generate_api_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum middleware: the bearer token's hash must be in the key registry.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::Unauthorized(MSG_AUTH_HEADER_MISSING.to_string()))?;

    let hashed = hash_api_key(state.config.require_hash_key()?, token)?;
    let known = {
        let db = state.db.lock().await;
        storage::api_key_exists(&db, &hashed)?
    };

    if !known {
        info!("Hashed API key not found in DB - call not authorized");
        return Err(AppError::Unauthorized(MSG_KEY_NOT_AUTHORIZED.to_string()));
    }

    debug!("Hashed API key found in DB: {} - call authorized", hashed);
    Ok(next.run(request).await)
}
