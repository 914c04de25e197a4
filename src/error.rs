//! Error types, one per failure class.
//!
//! The poll loop treats each class differently:
//!
//! * [`FetchError`] — a storefront call failed; that source yields nothing
//!   this cycle and the loop moves on.
//! * [`StoreError`] — the notification store failed; the current item is
//!   abandoned and the failure is logged at error level.
//! * [`DispatchError`] — the push transport failed after the item was
//!   recorded; logged and never retried.
//! * [`ConfigError`] — the `.env` file is missing or malformed; fatal at
//!   startup.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored date {value:?} for {source_id}/{key} is not YYYY-MM-DD")]
    CorruptDate {
        source_id: String,
        key: String,
        value: String,
    },

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: i64, supported: i64 },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("publish to {topic} failed: {source}")]
    Http {
        topic: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("publish to {topic} rejected with status {status}")]
    Status {
        topic: String,
        status: reqwest::StatusCode,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} is not a .env file", .0.display())]
    NotAnEnvFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("missing required key {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
