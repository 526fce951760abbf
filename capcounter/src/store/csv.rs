//! Flat-file backend: one `timestamp_ms,count` line per cap.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::{CapRow, Store, StoreError};

#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Render rows in file format, newline-terminated.
pub fn format_rows(rows: &[CapRow]) -> String {
    rows.iter()
        .map(|row| format!("{},{}\n", row.timestamp_ms, row.count))
        .collect()
}

impl Store for CsvStore {
    async fn load(&mut self) -> Result<Option<u32>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };

        let Some((idx, line)) = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .last()
        else {
            return Ok(None);
        };

        let count = line
            .split(',')
            .nth(1)
            .and_then(|field| field.trim().parse::<u32>().ok())
            .ok_or_else(|| StoreError::Malformed {
                path: self.path.clone(),
                line: idx + 1,
                content: line.to_string(),
            })?;
        Ok(Some(count))
    }

    async fn save(&mut self, rows: &[CapRow]) -> Result<(), StoreError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        file.write_all(format_rows(rows).as_bytes())
            .await
            .map_err(|e| self.io_err(e))?;
        file.flush().await.map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn load_missing_file_is_no_data() {
        let dir = tempdir().unwrap();
        let mut store = CsvStore::new(dir.path().join("caps.csv"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_empty_file_is_no_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("caps.csv");
        std::fs::write(&path, "").unwrap();
        assert_eq!(CsvStore::new(path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_appends_lines_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("caps.csv");
        let mut store = CsvStore::new(&path);

        store
            .save(&[CapRow::new(1_000, 41), CapRow::new(2_000, 42)])
            .await
            .unwrap();
        store.save(&[CapRow::new(3_000, 43)]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1000,41\n2000,42\n3000,43\n");
    }

    #[tokio::test]
    async fn load_returns_count_of_last_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("caps.csv");
        let mut store = CsvStore::new(&path);
        store
            .save(&[CapRow::new(1_000, 7), CapRow::new(1_500, 8)])
            .await
            .unwrap();

        let mut fresh = CsvStore::new(&path);
        assert_eq!(fresh.load().await.unwrap(), Some(8));
    }

    #[tokio::test]
    async fn load_ignores_trailing_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("caps.csv");
        std::fs::write(&path, "1000,5\n2000,6\n\n").unwrap();
        assert_eq!(CsvStore::new(path).load().await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn load_rejects_malformed_last_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("caps.csv");
        std::fs::write(&path, "1000,5\ngarbage\n").unwrap();
        match CsvStore::new(path).load().await {
            Err(StoreError::Malformed { line, content, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "garbage");
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let mut store = CsvStore::new(dir.path().join("nope").join("caps.csv"));
        let err = store.save(&[CapRow::new(1, 1)]).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
