use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::coverage::Coverage;
use crate::models::day::{DayRecord, HourRow};
use crate::utils::dates::{date_to_key_string, parse_key_string};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS day_records (
        id          INTEGER PRIMARY KEY,
        date        TEXT    NOT NULL UNIQUE,
        market_data TEXT    NOT NULL,
        scraped_at  TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS api_keys (
        id          INTEGER PRIMARY KEY,
        hashed_key  TEXT    NOT NULL UNIQUE,
        created_at  TEXT    NOT NULL
    );
";

/// Open (or create) the SQLite file and make sure the schema exists.
pub fn initialize_database(path: &Path) -> Result<Connection, AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    info!("Database ready at {}", path.display());
    Ok(conn)
}

/// In-memory database with the same schema, for tests and dry runs.
pub fn initialize_in_memory() -> Result<Connection, AppError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// True when `err` is a UNIQUE/PRIMARY KEY violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

// ── Day records ──

/// Insert a new day. Never overwrites: an existing date yields `DuplicateKey`.
pub fn insert_day(conn: &Connection, record: &DayRecord) -> Result<(), AppError> {
    let key = date_to_key_string(&record.date);
    let market_data = serde_json::to_string(&record.hours)?;
    debug!("Inserting {} hours for {}", record.hours.len(), key);

    conn.execute(
        "INSERT INTO day_records (date, market_data, scraped_at) VALUES (?1, ?2, ?3)",
        params![key, market_data, record.scraped_at],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateKey { date: key.clone() }
        } else {
            AppError::from(e)
        }
    })?;

    debug!("Stored day record {}", key);
    Ok(())
}

fn row_to_record(date: String, market_data: String, scraped_at: String) -> Result<DayRecord, AppError> {
    let hours: Vec<HourRow> = serde_json::from_str(&market_data)?;
    Ok(DayRecord {
        date: parse_key_string(&date)?,
        hours,
        scraped_at,
    })
}

pub fn get_day(conn: &Connection, date: NaiveDate) -> Result<Option<DayRecord>, AppError> {
    let row = conn
        .query_row(
            "SELECT date, market_data, scraped_at FROM day_records WHERE date = ?1",
            params![date_to_key_string(&date)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )
        .optional()?;

    row.map(|(d, m, s)| row_to_record(d, m, s)).transpose()
}

/// All days with `start <= date <= end`, oldest first.
pub fn get_days_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DayRecord>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT date, market_data, scraped_at
         FROM day_records
         WHERE date >= ?1 AND date <= ?2
         ORDER BY date ASC",
    )?;

    let rows = stmt
        .query_map(
            params![date_to_key_string(&start), date_to_key_string(&end)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(d, m, s)| row_to_record(d, m, s))
        .collect()
}

pub fn count_days(conn: &Connection) -> Result<i64, AppError> {
    let count = conn.query_row("SELECT COUNT(*) FROM day_records", [], |row| row.get(0))?;
    Ok(count)
}

/// Earliest and latest stored dates, or `None` for an empty store.
pub fn first_and_last_date(conn: &Connection) -> Result<Option<(NaiveDate, NaiveDate)>, AppError> {
    let (first, last): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(date), MAX(date) FROM day_records",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    match (first, last) {
        (Some(f), Some(l)) => Ok(Some((parse_key_string(&f)?, parse_key_string(&l)?))),
        _ => Ok(None),
    }
}

pub fn get_coverage(conn: &Connection) -> Result<Coverage, AppError> {
    let (first, last) = first_and_last_date(conn)?
        .ok_or_else(|| AppError::NotFound("no market data stored".to_string()))?;
    let stored = count_days(conn)?;
    Ok(Coverage::new(first, last, stored))
}

// ── API keys ──

pub fn insert_api_key(conn: &Connection, hashed_key: &str) -> Result<(), AppError> {
    let created_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    conn.execute(
        "INSERT INTO api_keys (hashed_key, created_at) VALUES (?1, ?2)",
        params![hashed_key, created_at],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::InvalidConfig("API key already registered".to_string())
        } else {
            AppError::from(e)
        }
    })?;
    Ok(())
}

pub fn api_key_exists(conn: &Connection, hashed_key: &str) -> Result<bool, AppError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM api_keys WHERE hashed_key = ?1",
            params![hashed_key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(date: NaiveDate, price: f64) -> DayRecord {
        let hours = (0..24)
            .map(|i| HourRow {
                index: i,
                label: i as u32 + 1,
                values: vec![Some(price), None, Some(-3.5)],
            })
            .collect();
        DayRecord::new(date, hours)
    }

    #[test]
    fn test_insert_and_read_back() {
        let conn = initialize_in_memory().unwrap();
        let record = day(ymd(2025, 1, 9), 2450.5);
        insert_day(&conn, &record).unwrap();

        let loaded = get_day(&conn, ymd(2025, 1, 9)).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(get_day(&conn, ymd(2025, 1, 10)).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_date_is_rejected() {
        let conn = initialize_in_memory().unwrap();
        let first = day(ymd(2025, 1, 9), 100.0);
        insert_day(&conn, &first).unwrap();

        let err = insert_day(&conn, &day(ymd(2025, 1, 9), 999.0)).unwrap_err();
        match err {
            AppError::DuplicateKey { date } => assert_eq!(date, "2025-01-09"),
            other => panic!("expected DuplicateKey, got {other:?}"),
        }

        assert_eq!(count_days(&conn).unwrap(), 1);
        let kept = get_day(&conn, ymd(2025, 1, 9)).unwrap().unwrap();
        assert_eq!(kept, first);
    }

    #[test]
    fn test_range_is_inclusive_and_ordered() {
        let conn = initialize_in_memory().unwrap();
        for d in [ymd(2025, 1, 5), ymd(2025, 1, 1), ymd(2025, 1, 3), ymd(2024, 12, 31)] {
            insert_day(&conn, &day(d, 1.0)).unwrap();
        }
        let days = get_days_in_range(&conn, ymd(2025, 1, 1), ymd(2025, 1, 5)).unwrap();
        let dates: Vec<_> = days.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![ymd(2025, 1, 1), ymd(2025, 1, 3), ymd(2025, 1, 5)]);
    }

    #[test]
    fn test_coverage() {
        let conn = initialize_in_memory().unwrap();
        assert!(matches!(get_coverage(&conn), Err(AppError::NotFound(_))));

        for d in [ymd(2025, 1, 1), ymd(2025, 1, 2), ymd(2025, 1, 10)] {
            insert_day(&conn, &day(d, 1.0)).unwrap();
        }
        let cov = get_coverage(&conn).unwrap();
        assert_eq!(cov.start_date, "2025-01-01");
        assert_eq!(cov.end_date, "2025-01-10");
        assert_eq!(cov.duration, 10);
        assert_eq!(cov.coverage, 3);
        assert_eq!(cov.gap, 7);
    }

    #[test]
    fn test_api_key_registry() {
        let conn = initialize_in_memory().unwrap();
        assert!(!api_key_exists(&conn, "abc").unwrap());
        insert_api_key(&conn, "abc").unwrap();
        assert!(api_key_exists(&conn, "abc").unwrap());
        assert!(insert_api_key(&conn, "abc").is_err());
    }

    #[test]
    fn test_database_file_created_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ote.db");
        {
            let conn = initialize_database(&path).unwrap();
            insert_day(&conn, &day(ymd(2025, 2, 1), 5.0)).unwrap();
        }
        let conn = initialize_database(&path).unwrap();
        assert_eq!(count_days(&conn).unwrap(), 1);
    }
}
