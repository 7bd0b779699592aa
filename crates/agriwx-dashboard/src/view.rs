//! What the dashboard shows for one region and date range.

use agriwx_store::{ForecastRecord, ForecastTable};
use chrono::{DateTime, NaiveDate, Utc};

use crate::filter::ForecastFilter;

/// Dashboard state for a filter over the current table.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    /// The store has never been populated.
    NoData,
    /// Rows exist, but none for this region and range.
    NoMatches {
        region: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    Populated(RegionView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub region: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub metrics: Metrics,
    pub chart: ChartSeries,
    pub rows: Vec<TableRow>,
    /// Most recent `fetched_at` among the selected rows.
    pub last_fetch: DateTime<Utc>,
}

/// Headline numbers for the latest date in range.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub latest_date: NaiveDate,
    pub latest_max: Option<f64>,
    pub latest_min: Option<f64>,
}

/// Max and min temperature lines; dates without a value are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub max: Vec<(NaiveDate, f64)>,
    pub min: Vec<(NaiveDate, f64)>,
}

impl ChartSeries {
    fn from_rows(rows: &[&ForecastRecord]) -> Self {
        Self {
            max: rows
                .iter()
                .filter_map(|r| r.max_temp.map(|t| (r.date, t)))
                .collect(),
            min: rows
                .iter()
                .filter_map(|r| r.min_temp.map(|t| (r.date, t)))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max.is_empty() && self.min.is_empty()
    }

    /// Lowest and highest value across both series.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.max
            .iter()
            .chain(&self.min)
            .map(|(_, t)| *t)
            .fold(None, |acc, t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub date: NaiveDate,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub description: Option<String>,
}

impl From<&ForecastRecord> for TableRow {
    fn from(record: &ForecastRecord) -> Self {
        Self {
            date: record.date,
            max_temp: record.max_temp,
            min_temp: record.min_temp,
            description: record.description.clone(),
        }
    }
}

pub fn build_view(table: &ForecastTable, filter: &ForecastFilter) -> DashboardView {
    let Some((start, end)) = filter.resolve(table) else {
        return DashboardView::NoData;
    };

    let mut rows = filter.apply(table);
    rows.sort_by_key(|r| r.date);

    let Some(latest) = rows.last() else {
        return DashboardView::NoMatches {
            region: filter.region.clone(),
            start,
            end,
        };
    };

    let last_fetch = rows
        .iter()
        .map(|r| r.fetched_at)
        .max()
        .unwrap_or(latest.fetched_at);

    let metrics = Metrics {
        latest_date: latest.date,
        latest_max: latest.max_temp,
        latest_min: latest.min_temp,
    };

    DashboardView::Populated(RegionView {
        region: filter.region.clone(),
        start,
        end,
        metrics,
        chart: ChartSeries::from_rows(&rows),
        rows: rows.iter().map(|r| TableRow::from(*r)).collect(),
        last_fetch,
    })
}
