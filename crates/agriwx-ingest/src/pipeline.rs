//! The fetch → normalize → upsert run.

use agriwx_core::Config;
use agriwx_store::ForecastStore;
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};

use crate::client::CwaClient;
use crate::error::IngestError;

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub fetched_at: DateTime<Utc>,
    /// Distinct regions in the feed, in feed order.
    pub regions: Vec<String>,
    /// Distinct `(location, date)` keys written.
    pub rows_written: usize,
    /// Rows stored with `max_temp < min_temp`.
    pub inverted: Vec<(String, NaiveDate)>,
    pub pruned: usize,
}

/// Owns the upstream client and the store for ingestion runs.
pub struct Crawler {
    client: CwaClient,
    store: ForecastStore,
    retention_days: Option<u32>,
}

impl Crawler {
    pub fn new(client: CwaClient, store: ForecastStore) -> Self {
        Self {
            client,
            store,
            retention_days: None,
        }
    }

    /// Prune rows older than `days` after each successful run.
    pub fn with_retention(mut self, days: Option<u32>) -> Self {
        self.retention_days = days;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, IngestError> {
        let client = CwaClient::new(&config.api)?;
        let store = ForecastStore::open(&config.storage.db_path)?;
        Ok(Self::new(client, store).with_retention(config.storage.retention_days))
    }

    /// Run one ingestion, stamping rows with the current time.
    pub async fn refresh(&mut self) -> Result<RefreshReport, IngestError> {
        self.refresh_at(Utc::now()).await
    }

    /// Run one ingestion with an explicit run timestamp.
    ///
    /// The whole payload is parsed before anything is written, and all rows go
    /// in one transaction together with any retention prune: a failure at any
    /// step leaves the store untouched.
    pub async fn refresh_at(&mut self, now: DateTime<Utc>) -> Result<RefreshReport, IngestError> {
        let fetched_at = now.trunc_subsecs(0);
        tracing::info!("Refreshing forecasts from {}", self.client.endpoint());

        let payload = self.client.fetch_payload().await?;
        let records = payload.into_records(fetched_at)?;

        let mut regions: Vec<String> = Vec::new();
        for record in &records {
            if !regions.contains(&record.location) {
                regions.push(record.location.clone());
            }
        }

        let inverted: Vec<(String, NaiveDate)> = records
            .iter()
            .filter(|r| r.has_inverted_range())
            .map(|r| {
                tracing::warn!(
                    location = %r.location,
                    date = %r.date,
                    "Upstream max temperature {:?} below min {:?}",
                    r.max_temp,
                    r.min_temp
                );
                (r.location.clone(), r.date)
            })
            .collect();

        if records.is_empty() {
            tracing::warn!("Forecast feed contained no rows");
        }

        let cutoff = self
            .retention_days
            .map(|days| retention_cutoff(fetched_at, days));
        let summary = self.store.upsert_all(&records, cutoff)?;
        let rows_written = summary.written;
        let pruned = summary.pruned;

        tracing::info!(
            "Stored {} forecast rows for {} regions",
            rows_written,
            regions.len()
        );

        Ok(RefreshReport {
            fetched_at,
            regions,
            rows_written,
            inverted,
            pruned,
        })
    }
}

fn retention_cutoff(now: DateTime<Utc>, days: u32) -> NaiveDate {
    now.date_naive() - Duration::days(i64::from(days))
}
