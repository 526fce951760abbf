//! In-memory counter state.
//!
//! [`Caps`] holds the cumulative count and the timestamps of caps that have
//! arrived since the last flush.  The count only ever moves forward: a
//! report is applied only when the device's count is ahead of ours.
//!
//! When the buffer is flushed, each pending cap is assigned the count it
//! brought.  With `n` pending caps and current count `c`, the cap at index
//! `i` (oldest first) is written with `c - (n - 1 - i)`, so the newest cap
//! carries `c` itself.

use crate::packet::Report;
use crate::store::{CapRow, Store, StoreError};

/// Outcome of offering a report to [`Caps::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Count advanced; `caps` timestamps were buffered.
    Accepted { caps: usize },
    /// Device is not ahead of us; nothing changed.
    Stale { remote: u32, local: u32 },
}

pub struct Caps<S> {
    count: u32,
    /// Pending cap timestamps (ms since epoch), arrival order.
    times: Vec<u64>,
    store: S,
    /// Rows written this session.
    flushed: usize,
}

impl<S: Store> Caps<S> {
    /// Start at zero; call [`Caps::load`] to resume from the store.
    pub fn new(store: S) -> Self {
        Self {
            count: 0,
            times: Vec::new(),
            store,
            flushed: 0,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn pending(&self) -> &[u64] {
        &self.times
    }

    pub fn flushed(&self) -> usize {
        self.flushed
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resume the count from the last persisted row; zero if there is none.
    pub async fn load(&mut self) -> Result<u32, StoreError> {
        self.count = self.store.load().await?.unwrap_or(0);
        Ok(self.count)
    }

    /// Buffer one cap timestamp. Does not persist.
    pub fn push(&mut self, timestamp_ms: u64) {
        self.times.push(timestamp_ms);
    }

    /// Apply `report` if its count is ahead of ours.
    pub fn accept(&mut self, report: &Report) -> Acceptance {
        if report.remote_count <= self.count {
            return Acceptance::Stale {
                remote: report.remote_count,
                local: self.count,
            };
        }
        self.count = report.remote_count;
        for cap in &report.caps {
            self.push(cap.timestamp_ms());
        }
        Acceptance::Accepted {
            caps: report.caps.len(),
        }
    }

    /// Rows the pending buffer would be flushed as, oldest first.
    pub fn pending_rows(&self) -> Vec<CapRow> {
        let last = self.times.len().saturating_sub(1);
        self.times
            .iter()
            .enumerate()
            .map(|(i, &ts)| {
                let back = u32::try_from(last - i).unwrap_or(u32::MAX);
                CapRow::new(ts, self.count.saturating_sub(back))
            })
            .collect()
    }

    /// Write pending caps to the store and clear the buffer.
    ///
    /// Returns the number of rows written.  An empty buffer never touches
    /// the store.  On error the buffer is left intact.
    pub async fn save(&mut self) -> Result<usize, StoreError> {
        if self.times.is_empty() {
            return Ok(0);
        }
        let rows = self.pending_rows();
        self.store.save(&rows).await?;
        self.times.clear();
        self.flushed += rows.len();
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::CapRecord;

    /// Keeps rows in memory and counts calls.
    #[derive(Default)]
    struct MemStore {
        rows: Vec<CapRow>,
        saves: usize,
        fail: bool,
    }

    impl Store for MemStore {
        async fn load(&mut self) -> Result<Option<u32>, StoreError> {
            Ok(self.rows.last().map(|r| r.count))
        }

        async fn save(&mut self, rows: &[CapRow]) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::BadValue("refused".into()));
            }
            self.saves += 1;
            self.rows.extend_from_slice(rows);
            Ok(())
        }
    }

    fn report(count: u32, caps: &[(u32, u16)]) -> Report {
        Report::new(
            count,
            caps.iter().map(|&(s, ms)| CapRecord::new(s, ms)).collect(),
        )
    }

    #[tokio::test]
    async fn load_from_empty_store_starts_at_zero() {
        let mut caps = Caps::new(MemStore::default());
        assert_eq!(caps.load().await.unwrap(), 0);
        assert_eq!(caps.count(), 0);
    }

    #[tokio::test]
    async fn accepted_report_assigns_counts_oldest_first() {
        let mut caps = Caps::new(MemStore::default());
        let outcome = caps.accept(&report(42, &[(100, 1), (101, 2)]));
        assert_eq!(outcome, Acceptance::Accepted { caps: 2 });
        assert_eq!(caps.count(), 42);
        assert_eq!(caps.pending(), &[100_001, 101_002]);

        assert_eq!(caps.save().await.unwrap(), 2);
        assert_eq!(
            caps.store().rows,
            vec![CapRow::new(100_001, 41), CapRow::new(101_002, 42)]
        );
        assert!(caps.pending().is_empty());
        assert_eq!(caps.flushed(), 2);
    }

    #[tokio::test]
    async fn stale_report_changes_nothing() {
        let mut caps = Caps::new(MemStore::default());
        caps.accept(&report(10, &[(1, 0)]));
        caps.save().await.unwrap();

        for remote in [10, 9, 0] {
            let outcome = caps.accept(&report(remote, &[(5, 5)]));
            assert_eq!(outcome, Acceptance::Stale { remote, local: 10 });
        }
        assert_eq!(caps.count(), 10);
        assert!(caps.pending().is_empty());
        assert_eq!(caps.save().await.unwrap(), 0);
        assert_eq!(caps.store().saves, 1);
    }

    #[tokio::test]
    async fn count_tracks_latest_accepted_report() {
        let mut caps = Caps::new(MemStore::default());
        let mut last = 0;
        for remote in [3, 1, 7, 7, 5, 20, 19] {
            if let Acceptance::Accepted { .. } = caps.accept(&report(remote, &[])) {
                last = remote;
            }
            assert!(caps.count() >= last);
            assert_eq!(caps.count(), last);
        }
        assert_eq!(caps.count(), 20);
    }

    #[tokio::test]
    async fn save_with_empty_buffer_is_noop() {
        let mut caps = Caps::new(MemStore::default());
        assert_eq!(caps.save().await.unwrap(), 0);
        caps.accept(&report(4, &[(1, 0)]));
        caps.save().await.unwrap();
        assert_eq!(caps.save().await.unwrap(), 0);
        assert_eq!(caps.store().saves, 1);
        assert_eq!(caps.store().rows.len(), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_buffer() {
        let mut caps = Caps::new(MemStore {
            fail: true,
            ..Default::default()
        });
        caps.accept(&report(2, &[(1, 0), (2, 0)]));
        assert!(caps.save().await.is_err());
        assert_eq!(caps.pending().len(), 2);
        assert_eq!(caps.flushed(), 0);
    }

    #[tokio::test]
    async fn reload_resumes_last_count() {
        let mut caps = Caps::new(MemStore::default());
        caps.accept(&report(8, &[(1, 0), (2, 0), (3, 0)]));
        caps.save().await.unwrap();

        let rows = caps.store().rows.clone();
        let mut fresh = Caps::new(MemStore {
            rows,
            ..Default::default()
        });
        assert_eq!(fresh.load().await.unwrap(), 8);
    }

    #[test]
    fn more_caps_than_count_saturates_at_zero() {
        let mut caps = Caps::new(MemStore::default());
        caps.accept(&report(1, &[(1, 0), (2, 0), (3, 0)]));
        let counts: Vec<u32> = caps.pending_rows().iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![0, 0, 1]);
    }
}
