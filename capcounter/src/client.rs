//! Client side of the protocol: ask a listener for its count, or play the
//! device and send it a report.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;

use crate::packet::{decode_count, PacketError, Report};
use crate::socket::Socket;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("no reply from {0} within {1:?}")]
    Timeout(SocketAddr, Duration),
    #[error("bad reply: {0}")]
    Packet(#[from] PacketError),
}

/// Query `server` for its current count.
///
/// Datagrams from other addresses are skipped while waiting.
pub async fn query_count(server: SocketAddr, wait: Duration) -> Result<u32, ClientError> {
    let socket = Socket::bind_for(server).await?;
    query_count_on(&socket, server, wait).await
}

/// Like [`query_count`], reusing an already bound socket.
pub async fn query_count_on(
    socket: &Socket,
    server: SocketAddr,
    wait: Duration,
) -> Result<u32, ClientError> {
    socket.send_query(server).await?;
    let reply = timeout(wait, async {
        loop {
            let (data, src) = socket.recv_from().await?;
            if src == server {
                return Ok::<_, io::Error>(data);
            }
            log::debug!("ignoring datagram from {src} while waiting for {server}");
        }
    })
    .await
    .map_err(|_| ClientError::Timeout(server, wait))??;
    Ok(decode_count(&reply)?)
}

/// Send `report` to `server` as the device would.
pub async fn send_report(socket: &Socket, server: SocketAddr, report: &Report) -> Result<(), ClientError> {
    socket.send_to(&report.encode(), server).await?;
    log::debug!(
        "sent report count={} caps={} to {server}",
        report.remote_count,
        report.caps.len()
    );
    Ok(())
}
