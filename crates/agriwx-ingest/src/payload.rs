//! Typed schema of the F-A0010-001 feed and its normalization into rows.
//!
//! Containers are optional in the serde structs so that a missing key is
//! reported as [`ParseError::MissingField`] with its path instead of a
//! generic serde message.

use std::collections::BTreeMap;

use agriwx_store::ForecastRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

const LOCATIONS_PATH: &str =
    "cwaopendata.resources.resource.data.agrWeatherForecasts.weatherForecasts.location";

#[derive(Debug, Deserialize)]
pub struct FeedDocument {
    cwaopendata: Option<OpenData>,
}

#[derive(Debug, Deserialize)]
struct OpenData {
    resources: Option<Resources>,
}

#[derive(Debug, Deserialize)]
struct Resources {
    resource: Option<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    data: Option<ResourceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceData {
    agr_weather_forecasts: Option<AgrWeatherForecasts>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgrWeatherForecasts {
    weather_forecasts: Option<WeatherForecasts>,
}

#[derive(Debug, Deserialize)]
struct WeatherForecasts {
    location: Option<Vec<LocationForecast>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationForecast {
    location_name: Option<String>,
    #[serde(default)]
    weather_elements: WeatherElements,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherElements {
    #[serde(rename = "MaxT")]
    max_t: Option<DailySeries<TemperatureEntry>>,
    #[serde(rename = "MinT")]
    min_t: Option<DailySeries<TemperatureEntry>>,
    #[serde(rename = "Wx")]
    wx: Option<DailySeries<WeatherEntry>>,
}

#[derive(Debug, Deserialize)]
struct DailySeries<T> {
    #[serde(default = "Vec::new")]
    daily: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemperatureEntry {
    data_date: Option<String>,
    /// Usually a numeric string; empty when the feed has no value.
    temperature: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeatherEntry {
    data_date: Option<String>,
    weather: Option<String>,
}

#[derive(Debug, Default)]
struct DayValues {
    max_temp: Option<f64>,
    min_temp: Option<f64>,
    description: Option<String>,
}

impl FeedDocument {
    pub fn from_json(body: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Flatten the feed into one record per `(location, date)`, all stamped with `fetched_at`.
    ///
    /// Dates are the union of the MaxT, MinT and Wx series for each location.
    pub fn into_records(self, fetched_at: DateTime<Utc>) -> Result<Vec<ForecastRecord>, ParseError> {
        let locations = self
            .cwaopendata
            .ok_or_else(|| ParseError::missing("cwaopendata"))?
            .resources
            .ok_or_else(|| ParseError::missing("cwaopendata.resources"))?
            .resource
            .ok_or_else(|| ParseError::missing("cwaopendata.resources.resource"))?
            .data
            .ok_or_else(|| ParseError::missing("cwaopendata.resources.resource.data"))?
            .agr_weather_forecasts
            .ok_or_else(|| {
                ParseError::missing("cwaopendata.resources.resource.data.agrWeatherForecasts")
            })?
            .weather_forecasts
            .ok_or_else(|| {
                ParseError::missing(
                    "cwaopendata.resources.resource.data.agrWeatherForecasts.weatherForecasts",
                )
            })?
            .location
            .ok_or_else(|| ParseError::missing(LOCATIONS_PATH))?;

        let mut records = Vec::new();
        for (index, location) in locations.into_iter().enumerate() {
            records.extend(location.into_records(index, fetched_at)?);
        }
        Ok(records)
    }
}

impl LocationForecast {
    fn into_records(
        self,
        index: usize,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<ForecastRecord>, ParseError> {
        let name = self
            .location_name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ParseError::missing(format!("{}[{}].locationName", LOCATIONS_PATH, index)))?;

        let mut days: BTreeMap<NaiveDate, DayValues> = BTreeMap::new();
        let elements = self.weather_elements;

        for entry in elements.max_t.map(|s| s.daily).unwrap_or_default() {
            let date = parse_date(&name, entry.data_date.as_deref(), "MaxT")?;
            days.entry(date).or_default().max_temp =
                parse_temperature(&name, date, entry.temperature.as_ref())?;
        }

        for entry in elements.min_t.map(|s| s.daily).unwrap_or_default() {
            let date = parse_date(&name, entry.data_date.as_deref(), "MinT")?;
            days.entry(date).or_default().min_temp =
                parse_temperature(&name, date, entry.temperature.as_ref())?;
        }

        for entry in elements.wx.map(|s| s.daily).unwrap_or_default() {
            let date = parse_date(&name, entry.data_date.as_deref(), "Wx")?;
            days.entry(date).or_default().description =
                entry.weather.filter(|w| !w.trim().is_empty());
        }

        if days.is_empty() {
            tracing::warn!("No daily entries for {}", name);
        }

        Ok(days
            .into_iter()
            .map(|(date, values)| ForecastRecord {
                location: name.clone(),
                date,
                max_temp: values.max_temp,
                min_temp: values.min_temp,
                description: values.description,
                fetched_at,
            })
            .collect())
    }
}

fn parse_date(location: &str, raw: Option<&str>, element: &str) -> Result<NaiveDate, ParseError> {
    let raw = raw.ok_or_else(|| {
        ParseError::missing(format!("{}.weatherElements.{}.daily[].dataDate", location, element))
    })?;

    // Some feed revisions send a full timestamp; its local date is the forecast day.
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|ts| ts.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|ts| ts.date()))
        .map_err(|_| ParseError::InvalidDate {
            location: location.to_string(),
            value: raw.to_string(),
        })
}

fn parse_temperature(
    location: &str,
    date: NaiveDate,
    raw: Option<&Value>,
) -> Result<Option<f64>, ParseError> {
    let invalid = |value: String| ParseError::InvalidTemperature {
        location: location.to_string(),
        date,
        value,
    };

    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| invalid(n.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(s.clone())),
        Some(other) => Err(invalid(other.to_string())),
    }
}
