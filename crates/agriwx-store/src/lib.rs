//! Forecast storage for agriwx.
//!
//! A single SQLite table of per-region daily forecasts keyed by
//! `(location, date)`, plus the in-memory [`ForecastTable`] readers get back.

pub mod error;
pub mod record;
pub mod store;
pub mod table;

pub use error::StoreError;
pub use record::ForecastRecord;
pub use store::{load_all, ForecastStore, UpsertSummary, FORECAST_TABLE};
pub use table::{ForecastTable, COLUMNS};
