use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::data::storage;
use crate::errors::AppError;
use crate::models::coverage::Coverage;
use crate::utils::dates::{date_to_key_string, day_difference, parse_key_string};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataQuery {
    start_date: String,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateDiffQuery {
    start_date: String,
    end_date: String,
}

/// `GET /marketData?startDate=&endDate=`
///
/// With `endDate`: every stored day in the inclusive range, as an array.
/// Without it: the single day `startDate`, or 404.
pub async fn market_data(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MarketDataQuery>,
) -> Result<Json<Value>, AppError> {
    let start = parse_key_string(&q.start_date)?;

    match q.end_date.as_deref() {
        Some(end) => {
            let end = parse_key_string(end)?;
            if end < start {
                return Err(AppError::InvalidDate(format!(
                    "endDate {} is before startDate {}",
                    end, start
                )));
            }
            let days = {
                let db = state.db.lock().await;
                storage::get_days_in_range(&db, start, end)?
            };
            Ok(Json(Value::Array(
                days.iter().map(|d| d.to_market_json()).collect(),
            )))
        }
        None => {
            let day = {
                let db = state.db.lock().await;
                storage::get_day(&db, start)?
            };
            day.map(|d| Json(d.to_market_json())).ok_or_else(|| {
                AppError::NotFound(format!("no market data for {}", date_to_key_string(&start)))
            })
        }
    }
}

/// `GET /coverage`
pub async fn coverage(State(state): State<Arc<AppState>>) -> Result<Json<Coverage>, AppError> {
    let db = state.db.lock().await;
    Ok(Json(storage::get_coverage(&db)?))
}

/// `GET /dateDiff?startDate=&endDate=`
pub async fn date_diff(Query(q): Query<DateDiffQuery>) -> Result<Json<Value>, AppError> {
    let start = parse_key_string(&q.start_date)?;
    let end = parse_key_string(&q.end_date)?;
    Ok(Json(json!({
        "startDate": date_to_key_string(&start),
        "endDate": date_to_key_string(&end),
        "duration": day_difference(start, end),
    })))
}
