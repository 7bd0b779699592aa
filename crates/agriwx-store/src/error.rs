//! Store error types.

use std::path::PathBuf;

use agriwx_core::error::RusqliteErrorExt;
use agriwx_core::{AppError, DatabaseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open forecast store '{path}'")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable value in column '{column}': {value}")]
    Corrupt { column: &'static str, value: String },
}

impl StoreError {
    pub(crate) fn corrupt(column: &'static str, value: impl Into<String>) -> Self {
        Self::Corrupt {
            column,
            value: value.into(),
        }
    }
}

impl From<StoreError> for DatabaseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Open { path, source } => {
                DatabaseError::ConnectionFailed(format!("{}: {}", path.display(), source))
            }
            StoreError::Query(e) => e.into_database_error(),
            StoreError::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            corrupt @ StoreError::Corrupt { .. } => DatabaseError::Corruption(corrupt.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Database(err.into())
    }
}
