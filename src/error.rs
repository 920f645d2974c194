//! Error types for the record store, snapshots and OCR.

use thiserror::Error;

/// Validation and lookup failures raised by the record store.
///
/// Every variant is returned before any state is touched, so a failed
/// mutation leaves the store exactly as it was.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("stock name must not be empty")]
    EmptyName,

    #[error("ticker {0} is already registered")]
    DuplicateTicker(String),

    #[error("ticker {0} is not registered; add it with `stonklog stock add` first")]
    UnknownTicker(String),

    #[error("price must be a positive number (got {0})")]
    NonPositivePrice(f64),

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("invalid date {0:?}; expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid quarter label {0:?}; expected YYYYQn with n in 1-4")]
    InvalidQuarter(String),

    #[error("quarter {quarter} is not recorded for {ticker}")]
    UnknownQuarter { ticker: String, quarter: String },

    #[error("no record with id {0}")]
    RecordNotFound(String),
}

/// Failures while decoding a persisted or imported snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot must be a JSON object")]
    NotAnObject,
}

/// Failures from the OCR collaborator.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine `{0}` is not available")]
    EngineUnavailable(String),

    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine exited with {status}: {stderr}")]
    EngineFailed { status: String, stderr: String },

    #[error("OCR engine failed to run: {0}")]
    Io(#[from] std::io::Error),
}
