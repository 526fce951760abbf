//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that moves
//! whole datagrams.  Decoding lives in [`crate::packet`]; this module owns
//! only byte I/O.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

use crate::packet::{encode_count, MSG_GET_COUNT};

/// Maximum UDP payload size.
const MAX_DATAGRAM: usize = 65_535;

/// A datagram-oriented UDP socket.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Bind an ephemeral socket of the same address family as `peer`.
    pub async fn bind_for(peer: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        Self::bind(local).await
    }

    /// Send `bytes` as a single UDP datagram to `dest`.
    pub async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    /// Reply to a count query.
    pub async fn send_count(&self, count: u32, dest: SocketAddr) -> io::Result<()> {
        self.send_to(&encode_count(count), dest).await
    }

    /// Send a count query.
    pub async fn send_query(&self, dest: SocketAddr) -> io::Result<()> {
        self.send_to(&[MSG_GET_COUNT], dest).await
    }

    /// Receive the next datagram.
    ///
    /// Returns `(payload, sender_address)`.  Cancel-safe, so it can sit in a
    /// `tokio::select!` next to a shutdown signal.
    pub async fn recv_from(&self) -> io::Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }
}
