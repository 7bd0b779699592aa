//! Ingestion error types.

use std::path::PathBuf;

use agriwx_core::error::ReqwestErrorExt;
use agriwx_core::{AppError, NetworkError};
use agriwx_store::StoreError;
use chrono::NaiveDate;
use thiserror::Error;

/// The forecast feed could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Forecast API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Fallback file '{path}' unusable after fetch failure ({cause}): {reason}")]
    Fallback {
        path: PathBuf,
        cause: String,
        reason: String,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// The feed body did not match the expected shape.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed forecast payload: {0}")]
    Body(#[from] serde_json::Error),

    #[error("Missing field '{path}' in forecast payload")]
    MissingField { path: String },

    #[error("Invalid date '{value}' for {location}")]
    InvalidDate { location: String, value: String },

    #[error("Non-numeric temperature '{value}' for {location} on {date}")]
    InvalidTemperature {
        location: String,
        date: NaiveDate,
        value: String,
    },
}

impl ParseError {
    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Store failed: {0}")]
    Store(#[from] StoreError),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Fetch(FetchError::Timeout { .. }) => {
                AppError::Network(NetworkError::Timeout)
            }
            IngestError::Fetch(FetchError::Status { status, body }) => {
                AppError::Network(NetworkError::ServerError {
                    status: status.as_u16(),
                    message: body,
                })
            }
            IngestError::Fetch(FetchError::Request { source, .. }) => {
                AppError::Network(source.into_network_error())
            }
            IngestError::Fetch(e) => AppError::Network(NetworkError::ConnectionFailed(e.to_string())),
            IngestError::Parse(e) => AppError::Network(NetworkError::InvalidResponse(e.to_string())),
            IngestError::Store(e) => e.into(),
        }
    }
}
