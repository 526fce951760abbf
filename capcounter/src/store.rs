//! Durable storage for cap rows.
//!
//! A [`Store`] knows two things: how to append a batch of [`CapRow`]s and
//! how to recover the last cumulative count it holds.  Two backends exist:
//! - [`CsvStore`]    — append-only `timestamp_ms,count` text file
//! - [`InfluxStore`] — InfluxDB 1.x HTTP API (`capcounter` measurement)

use std::future::Future;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod csv;
pub mod influx;

pub use csv::CsvStore;
pub use influx::InfluxStore;

/// One persisted cap: when it happened and the cumulative count it brought.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapRow {
    pub timestamp_ms: u64,
    pub count: u32,
}

impl CapRow {
    pub fn new(timestamp_ms: u64, count: u32) -> Self {
        Self {
            timestamp_ms,
            count,
        }
    }
}

/// Append-only cap storage.
pub trait Store {
    /// Last persisted cumulative count, or `None` when the store holds nothing yet.
    fn load(&mut self) -> impl Future<Output = Result<Option<u32>, StoreError>> + Send;

    /// Append `rows` in order.
    fn save(&mut self, rows: &[CapRow]) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Where the listener keeps its caps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Csv { path: PathBuf },
    Influx { url: String, database: String },
}

impl std::fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Csv { path } => write!(f, "CSV {}", path.display()),
            StoreConfig::Influx { url, database } => write!(f, "InfluxDB {url} (db {database})"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed record at {}:{line}: {content:?}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        content: String,
    },
    #[error("time-series request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("time-series server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("time-series query returned an unusable value: {0}")]
    BadValue(String),
}
