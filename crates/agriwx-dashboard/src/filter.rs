//! Region and date-range selection over a loaded table.

use std::collections::BTreeSet;

use agriwx_store::{ForecastRecord, ForecastTable};
use chrono::NaiveDate;

/// Distinct regions, sorted.
pub fn regions(table: &ForecastTable) -> Vec<String> {
    table
        .locations()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Earliest and latest forecast date, or `None` for an empty table.
pub fn date_bounds(table: &ForecastTable) -> Option<(NaiveDate, NaiveDate)> {
    let min = table.dates().min()?;
    let max = table.dates().max()?;
    Some((min, max))
}

/// The preferred region if present, otherwise the first one.
pub fn default_region<'a>(regions: &'a [String], preferred: &str) -> Option<&'a str> {
    regions
        .iter()
        .find(|r| r.as_str() == preferred)
        .or_else(|| regions.first())
        .map(String::as_str)
}

/// One region over an inclusive date range.
///
/// Open ends fall back to the table's date bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastFilter {
    pub region: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ForecastFilter {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            start: None,
            end: None,
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Concrete `(start, end)` for this table; a reversed range is swapped.
    pub fn resolve(&self, table: &ForecastTable) -> Option<(NaiveDate, NaiveDate)> {
        let (lo, hi) = date_bounds(table)?;
        let start = self.start.unwrap_or(lo);
        let end = self.end.unwrap_or(hi);
        Some(if start <= end { (start, end) } else { (end, start) })
    }

    pub fn apply<'a>(&self, table: &'a ForecastTable) -> Vec<&'a ForecastRecord> {
        let Some((start, end)) = self.resolve(table) else {
            return Vec::new();
        };

        table
            .iter()
            .filter(|r| r.location == self.region && r.date >= start && r.date <= end)
            .collect()
    }
}
