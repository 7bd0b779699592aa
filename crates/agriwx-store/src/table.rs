//! In-memory tabular view of the forecast store.

use chrono::{DateTime, NaiveDate, Utc};

use crate::record::ForecastRecord;

/// Column names, in storage order.
pub const COLUMNS: [&str; 6] = [
    "location",
    "date",
    "max_temp",
    "min_temp",
    "description",
    "fetched_at",
];

/// Every loaded forecast row, with one column view per attribute.
///
/// An empty table is the normal "no data yet" state, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastTable {
    rows: Vec<ForecastRecord>,
}

impl ForecastTable {
    pub fn new(rows: Vec<ForecastRecord>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ForecastRecord] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastRecord> {
        self.rows.iter()
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|r| r.location.as_str())
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    pub fn max_temps(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(|r| r.max_temp)
    }

    pub fn min_temps(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(|r| r.min_temp)
    }

    pub fn descriptions(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows.iter().map(|r| r.description.as_deref())
    }

    pub fn fetched_ats(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.rows.iter().map(|r| r.fetched_at)
    }
}
