//! Error type definitions for the photo-chooser application
//!
//! Failures in this service are almost never fatal: a record that cannot be
//! fetched or compressed is marked invalid and excluded from selection, and
//! missing or corrupt state files fall back to safe defaults. The types here
//! cover the remaining cases that do need to surface to a caller.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Filesystem errors around the manifest, URL list and cache directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Manifest serialization/deserialization failures
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
