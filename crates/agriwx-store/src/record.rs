use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One region/day forecast row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub location: String,
    pub date: NaiveDate,
    /// Daily maximum in °C; `None` when the feed omits it.
    pub max_temp: Option<f64>,
    /// Daily minimum in °C; `None` when the feed omits it.
    pub min_temp: Option<f64>,
    pub description: Option<String>,
    /// When the ingestion run that wrote this row started.
    pub fetched_at: DateTime<Utc>,
}

impl ForecastRecord {
    /// True when both temperatures are present and the maximum is below the minimum.
    pub fn has_inverted_range(&self) -> bool {
        matches!((self.max_temp, self.min_temp), (Some(max), Some(min)) if max < min)
    }

    /// The `(location, date, max, min, description)` tuple, ignoring `fetched_at`.
    pub fn content_key(&self) -> (&str, NaiveDate, Option<f64>, Option<f64>, Option<&str>) {
        (
            &self.location,
            self.date,
            self.max_temp,
            self.min_temp,
            self.description.as_deref(),
        )
    }
}
