//! SQLite-backed forecast store.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

use crate::error::StoreError;
use crate::record::ForecastRecord;
use crate::table::{ForecastTable, COLUMNS};

pub const FORECAST_TABLE: &str = "forecasts";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// `SELECT` of every column in [`COLUMNS`] order, which [`RawRow::from_row`] relies on.
fn select_all() -> String {
    format!("SELECT {} FROM {}", COLUMNS.join(", "), FORECAST_TABLE)
}

/// Columns as read from SQLite, before date/time parsing.
struct RawRow {
    location: String,
    date: String,
    max_temp: Option<f64>,
    min_temp: Option<f64>,
    description: Option<String>,
    fetched_at: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            location: row.get(0)?,
            date: row.get(1)?,
            max_temp: row.get(2)?,
            min_temp: row.get(3)?,
            description: row.get(4)?,
            fetched_at: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<ForecastRecord, StoreError> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|_| StoreError::corrupt("date", &self.date))?;
        let fetched_at = DateTime::parse_from_rfc3339(&self.fetched_at)
            .map_err(|_| StoreError::corrupt("fetched_at", &self.fetched_at))?
            .with_timezone(&Utc);

        Ok(ForecastRecord {
            location: self.location,
            date,
            max_temp: self.max_temp,
            min_temp: self.min_temp,
            description: self.description,
            fetched_at,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Row counts from one [`ForecastStore::upsert_all`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Distinct `(location, date)` keys written.
    pub written: usize,
    pub pruned: usize,
}

/// Read/write access to the `forecasts` table.
///
/// Single writer; readers in other processes may observe a run's rows only
/// once its transaction commits.
pub struct ForecastStore {
    conn: Connection,
}

impl ForecastStore {
    /// Open (or create) the store at the given path.
    ///
    /// Creates the parent directory and the schema if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::debug!("Opened forecast store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (tests and dry runs).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS forecasts (
                location TEXT NOT NULL,
                date TEXT NOT NULL,
                max_temp REAL,
                min_temp REAL,
                description TEXT,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (location, date)
            );
            "#,
        )?;
        Ok(())
    }

    /// Insert or replace every record by `(location, date)`, then optionally delete
    /// rows dated before `prune_before`, all in one transaction.
    ///
    /// On error nothing from this call is kept.
    pub fn upsert_all(
        &mut self,
        records: &[ForecastRecord],
        prune_before: Option<NaiveDate>,
    ) -> Result<UpsertSummary, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT OR REPLACE INTO forecasts
                (location, date, max_temp, min_temp, description, fetched_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            for record in records {
                stmt.execute(params![
                    record.location,
                    format_date(record.date),
                    record.max_temp,
                    record.min_temp,
                    record.description,
                    format_timestamp(record.fetched_at),
                ])?;
            }
        }

        let pruned = match prune_before {
            Some(cutoff) => tx.execute(
                "DELETE FROM forecasts WHERE date < ?1",
                params![format_date(cutoff)],
            )?,
            None => 0,
        };
        tx.commit()?;

        let written = records
            .iter()
            .map(|r| (r.location.as_str(), r.date))
            .collect::<HashSet<_>>()
            .len();

        tracing::debug!("Upserted {} forecast rows", written);
        if pruned > 0 {
            tracing::info!("Pruned {} forecast rows dated before {:?}", pruned, prune_before);
        }
        Ok(UpsertSummary { written, pruned })
    }

    /// Get a single row by key.
    pub fn get(&self, location: &str, date: NaiveDate) -> Result<Option<ForecastRecord>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("{} WHERE location = ?1 AND date = ?2", select_all()),
                params![location, format_date(date)],
                RawRow::from_row,
            )
            .optional()?;

        raw.map(RawRow::into_record).transpose()
    }

    /// Load every row. Ordering by key is for stable output only.
    pub fn load_all(&self) -> Result<ForecastTable, StoreError> {
        read_table(&self.conn)
    }
}

fn read_table(conn: &Connection) -> Result<ForecastTable, StoreError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY location, date", select_all()))?;
    let raw_rows = stmt
        .query_map([], RawRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let rows = raw_rows
        .into_iter()
        .map(RawRow::into_record)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ForecastTable::new(rows))
}

/// Load the whole forecast table from a store file without creating it.
///
/// A missing file or a missing `forecasts` table yields an empty table.
pub fn load_all<P: AsRef<Path>>(path: P) -> Result<ForecastTable, StoreError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No forecast store at {}", path.display());
        return Ok(ForecastTable::empty());
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![FORECAST_TABLE],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(ForecastTable::empty());
    }

    read_table(&conn)
}
