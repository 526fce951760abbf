//! Time-series backend speaking the InfluxDB 1.x HTTP API.
//!
//! Each cap becomes one point of the [`MEASUREMENT`] measurement with a
//! single float field, `count`, stamped at millisecond precision.

use reqwest::Client;
use serde::Deserialize;

use super::{CapRow, Store, StoreError};

/// Measurement every cap point is written to.
pub const MEASUREMENT: &str = "capcounter";

const LAST_COUNT_QUERY: &str = "SELECT last(count) FROM capcounter";

#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: Client,
    url: String,
    database: String,
}

impl InfluxStore {
    /// `url` is the server base, e.g. `http://localhost:8086`.
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url, database)
    }

    pub fn with_client(client: Client, url: impl Into<String>, database: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            database: database.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url, path)
    }
}

/// Render rows as line protocol, one point per line.
pub fn line_protocol(rows: &[CapRow]) -> String {
    rows.iter()
        .map(|row| format!("{MEASUREMENT} count={} {}\n", row.count, row.timestamp_ms))
        .collect()
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Pull the `last` column out of a `SELECT last(...)` response.
fn last_count(response: QueryResponse) -> Result<Option<u32>, StoreError> {
    let Some(result) = response.results.into_iter().next() else {
        return Ok(None);
    };
    if let Some(err) = result.error {
        return Err(StoreError::BadValue(err));
    }
    let Some(series) = result.series.into_iter().next() else {
        return Ok(None);
    };
    let col = series
        .columns
        .iter()
        .position(|c| c == "last")
        .ok_or_else(|| StoreError::BadValue(format!("no `last` column in {:?}", series.columns)))?;
    let Some(row) = series.values.into_iter().next() else {
        return Ok(None);
    };
    let value = row.get(col).and_then(serde_json::Value::as_f64);
    match value {
        Some(v) if v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX) => Ok(Some(v.round() as u32)),
        _ => Err(StoreError::BadValue(format!("{:?}", row.get(col)))),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

impl Store for InfluxStore {
    async fn load(&mut self) -> Result<Option<u32>, StoreError> {
        let response = self
            .client
            .get(self.endpoint("query"))
            .query(&[("db", self.database.as_str()), ("q", LAST_COUNT_QUERY)])
            .send()
            .await?;
        let body: QueryResponse = check_status(response).await?.json().await?;
        last_count(body)
    }

    async fn save(&mut self, rows: &[CapRow]) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.endpoint("write"))
            .query(&[("db", self.database.as_str()), ("precision", "ms")])
            .body(line_protocol(rows))
            .send()
            .await?;
        check_status(response).await?;
        log::debug!("wrote {} points to {}", rows.len(), self.database);
        Ok(())
    }
}
