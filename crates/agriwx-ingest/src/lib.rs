//! Ingestion pipeline for the CWA weekly agricultural forecast.
//!
//! Fetches the feed, normalizes it into [`agriwx_store::ForecastRecord`]s and
//! upserts them into the local store.

pub mod client;
pub mod error;
pub mod payload;
pub mod pipeline;

pub use client::CwaClient;
pub use error::{FetchError, IngestError, ParseError};
pub use payload::FeedDocument;
pub use pipeline::{Crawler, RefreshReport};
