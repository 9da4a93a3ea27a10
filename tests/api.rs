// tests/api.rs
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use ote_scraper::api::{router, SERVER_ID};
use ote_scraper::auth::{hash_api_key, MSG_AUTH_HEADER_MISSING, MSG_KEY_NOT_AUTHORIZED};
use ote_scraper::data::storage;
use ote_scraper::models::config::AppConfig;
use ote_scraper::models::day::{DayRecord, HourRow};
use ote_scraper::AppState;

const SECRET: &str = "test-secret";
const KEY: &str = "1f0c8a52-5d7e-4d3e-9a43-9a1fbb7d2c11";

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn day(date: NaiveDate) -> DayRecord {
    let hours = (0..24)
        .map(|i| HourRow {
            index: i,
            label: i as u32 + 1,
            values: vec![Some(100.0 + i as f64), None],
        })
        .collect();
    DayRecord::new(date, hours)
}

fn app(days: &[NaiveDate]) -> Router {
    let conn = storage::initialize_in_memory().unwrap();
    storage::insert_api_key(&conn, &hash_api_key(SECRET, KEY).unwrap()).unwrap();
    for d in days {
        storage::insert_day(&conn, &day(*d)).unwrap();
    }
    let config = AppConfig {
        hash_key: SECRET.to_string(),
        ..AppConfig::default()
    };
    router(Arc::new(AppState::with_connection(config, conn)))
}

async fn get(app: Router, uri: &str, key: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().uri(uri);
    if let Some(k) = key {
        req = req.header("authorization", format!("Bearer {k}"));
    }
    let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn root_needs_no_key() {
    let (status, body) = get(app(&[]), "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "msg": SERVER_ID }));
}

#[tokio::test]
async fn missing_header_is_rejected() {
    let (status, body) = get(app(&[]), "/coverage", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], MSG_AUTH_HEADER_MISSING);
}

#[tokio::test]
async fn unknown_key_is_rejected() {
    let (status, body) = get(app(&[]), "/coverage", Some("not-a-registered-key")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], MSG_KEY_NOT_AUTHORIZED);
}

#[tokio::test]
async fn single_day_market_data() {
    let app = app(&[ymd(2025, 1, 9)]);
    let (status, body) = get(app, "/marketData?startDate=2025-01-09", Some(KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2025-01-09");
    let hours = body["marketData"].as_array().unwrap();
    assert_eq!(hours.len(), 24);
    assert_eq!(hours[2], json!([2, 102.0, null]));
}

#[tokio::test]
async fn single_day_not_stored_is_404() {
    let (status, body) = get(app(&[]), "/marketData?startDate=2025-01-09", Some(KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn range_market_data_is_inclusive() {
    let app = app(&[ymd(2025, 1, 1), ymd(2025, 1, 2), ymd(2025, 1, 4), ymd(2025, 1, 5)]);
    let (status, body) = get(
        app,
        "/marketData?startDate=2025-01-02&endDate=2025-01-04",
        Some(KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-01-02", "2025-01-04"]);
}

#[tokio::test]
async fn malformed_date_is_400() {
    let (status, body) = get(app(&[]), "/marketData?startDate=2025-02-30", Some(KEY)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_DATE");
}

#[tokio::test]
async fn coverage_reports_gap() {
    let app = app(&[ymd(2024, 12, 30), ymd(2024, 12, 31), ymd(2025, 1, 3)]);
    let (status, body) = get(app, "/coverage", Some(KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "startDate": "2024-12-30",
            "endDate": "2025-01-03",
            "duration": 5,
            "coverage": 3,
            "gap": 2,
        })
    );
}

#[tokio::test]
async fn date_diff_is_absolute() {
    let (status, body) = get(
        app(&[]),
        "/dateDiff?startDate=2025-03-01&endDate=2025-02-27",
        Some(KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duration"], 2);
    assert_eq!(body["startDate"], "2025-03-01");
}

#[tokio::test]
async fn unknown_route_behind_auth() {
    let (status, _) = get(app(&[]), "/nope", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = get(app(&[]), "/nope", Some(KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Record not found: Not found");
}
