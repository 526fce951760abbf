//! The listener loop.
//!
//! ```text
//!          ┌──────── recv_from ◀────────┐
//!          ▼                            │
//!     [ dispatch ] ── query ──▶ reply count
//!          │
//!          └─ report ──▶ Caps::accept ──▶ Caps::save ──▶ Store
//! ```
//!
//! One datagram is handled to completion, store write included, before the
//! next receive.  A shutdown future (ctrl-c in the binary) is raced against
//! the receive; when it fires the buffer is flushed once more and the loop
//! returns.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::caps::{Acceptance, Caps};
use crate::packet::{carries_report, is_count_query, Report};
use crate::socket::Socket;
use crate::store::{CsvStore, InfluxStore, Store, StoreConfig, StoreError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Handle one datagram from `src`.
///
/// A datagram can be both a query and a report; the query is answered first.
pub async fn handle_datagram<S: Store>(
    socket: &Socket,
    caps: &mut Caps<S>,
    data: &[u8],
    src: SocketAddr,
) -> Result<(), ServerError> {
    if data.is_empty() {
        log::debug!("{src}: empty datagram ignored");
        return Ok(());
    }

    if is_count_query(data) {
        log::info!("{src}: GET_COUNT -> {}", caps.count());
        if let Err(e) = socket.send_count(caps.count(), src).await {
            log::warn!("{src}: count reply failed: {e}");
        }
    }

    if carries_report(data) {
        let report = match Report::decode(data) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("{src}: {e}");
                return Ok(());
            }
        };
        if report.trailing > 0 {
            log::warn!(
                "{src}: {} trailing bytes after {} caps dropped",
                report.trailing,
                report.caps.len()
            );
        }
        log::info!("{src}: received {} caps", report.caps.len());

        match caps.accept(&report) {
            Acceptance::Accepted { caps: n } => {
                for cap in &report.caps {
                    log::debug!("{src}: cap at {} ms", cap.timestamp_ms());
                }
                let written = caps.save().await?;
                log::info!("count now {}, {n} caps buffered, {written} rows saved", caps.count());
            }
            Acceptance::Stale { remote, local } => {
                log::warn!("{src}: rejected report, remote {remote} <= local {local}");
            }
        }
    }

    Ok(())
}

/// Serve datagrams on `socket` until `shutdown` resolves, then flush.
pub async fn serve<S, F>(socket: &Socket, caps: &mut Caps<S>, shutdown: F) -> Result<(), ServerError>
where
    S: Store,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    log::info!("listening on {}", socket.local_addr);

    loop {
        tokio::select! {
            result = socket.recv_from() => {
                let (data, src) = result?;
                handle_datagram(socket, caps, &data, src).await?;
            }
            _ = &mut shutdown => break,
        }
    }

    let written = caps.save().await?;
    log::info!(
        "saved {} entries this session ({written} on shutdown), count {}",
        caps.flushed(),
        caps.count()
    );
    Ok(())
}

/// Open the configured store, resume the count, and serve on `bind`.
pub async fn run<F>(bind: SocketAddr, store: StoreConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()>,
{
    log::info!("using {store}");
    match store {
        StoreConfig::Csv { path } => run_with(bind, CsvStore::new(path), shutdown).await,
        StoreConfig::Influx { url, database } => {
            run_with(bind, InfluxStore::new(url, database), shutdown).await
        }
    }
}

async fn run_with<S, F>(bind: SocketAddr, store: S, shutdown: F) -> Result<(), ServerError>
where
    S: Store,
    F: Future<Output = ()>,
{
    let mut caps = Caps::new(store);
    let count = caps.load().await?;
    log::info!("caps: {count}");

    let socket = Socket::bind(bind).await?;
    serve(&socket, &mut caps, shutdown).await
}
