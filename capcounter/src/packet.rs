//! Wire-format definitions for the cap counter protocol.
//!
//! Every datagram the device exchanges with the listener is one of:
//! - a **count query**: first byte is [`MSG_GET_COUNT`], nothing else needed;
//! - a **report**: any datagram longer than one byte, carrying the device's
//!   cumulative counter followed by a run of cap timestamps.
//!
//! The two are not mutually exclusive: a report whose first byte happens to
//! be `1` is also a query, and the listener answers both.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **little-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Remote Cumulative Count                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                          Seconds (cap 0)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |       Milliseconds (cap 0)    |       Seconds (cap 1) ...     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Record count is `(len - 4) / 6`; bytes that do not make up a whole
//! record are reported in [`Report::trailing`] and otherwise ignored.

/// First byte of a count query.
pub const MSG_GET_COUNT: u8 = 1;

/// Byte length of the cumulative count field (report header and query reply).
pub const COUNT_LEN: usize = 4;

/// Byte length of one cap record: seconds(4) + milliseconds(2).
pub const CAP_RECORD_LEN: usize = 6;

/// One cap timestamp as the device encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapRecord {
    /// Whole seconds since the Unix epoch.
    pub secs: u32,
    /// Sub-second part in milliseconds.
    pub millis: u16,
}

impl CapRecord {
    pub fn new(secs: u32, millis: u16) -> Self {
        Self { secs, millis }
    }

    /// Milliseconds since the Unix epoch: `secs * 1000 + millis`.
    pub fn timestamp_ms(&self) -> u64 {
        u64::from(self.secs) * 1000 + u64::from(self.millis)
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            secs: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            millis: u16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

/// A decoded report datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Cumulative count as observed by the device.
    pub remote_count: u32,
    /// Cap timestamps, oldest first.
    pub caps: Vec<CapRecord>,
    /// Bytes after the last whole record that were dropped.
    pub trailing: usize,
}

impl Report {
    pub fn new(remote_count: u32, caps: Vec<CapRecord>) -> Self {
        Self {
            remote_count,
            caps,
            trailing: 0,
        }
    }

    /// Serialise this report into a newly allocated byte vector.
    ///
    /// `trailing` is not encoded; the output always holds whole records.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(COUNT_LEN + self.caps.len() * CAP_RECORD_LEN);
        buf.extend_from_slice(&self.remote_count.to_le_bytes());
        for cap in &self.caps {
            buf.extend_from_slice(&cap.secs.to_le_bytes());
            buf.extend_from_slice(&cap.millis.to_le_bytes());
        }
        buf
    }

    /// Parse a [`Report`] from a raw datagram.
    ///
    /// Returns [`Err`] if `buf` is too short to hold the count field.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < COUNT_LEN {
            return Err(PacketError::BufferTooShort(buf.len()));
        }

        let remote_count = decode_count(&buf[..COUNT_LEN])?;
        let body = &buf[COUNT_LEN..];
        let chunks = body.chunks_exact(CAP_RECORD_LEN);
        let trailing = chunks.remainder().len();
        let caps = chunks.map(CapRecord::read).collect();

        Ok(Self {
            remote_count,
            caps,
            trailing,
        })
    }
}

/// True if the datagram asks for the current count.
pub fn is_count_query(buf: &[u8]) -> bool {
    buf.first() == Some(&MSG_GET_COUNT)
}

/// True if the datagram should be handled as a report.
pub fn carries_report(buf: &[u8]) -> bool {
    buf.len() > 1
}

/// Encode a count as the 4-byte query reply.
pub fn encode_count(count: u32) -> [u8; COUNT_LEN] {
    count.to_le_bytes()
}

/// Decode a 4-byte query reply.
pub fn decode_count(buf: &[u8]) -> Result<u32, PacketError> {
    let bytes: [u8; COUNT_LEN] = buf
        .try_into()
        .map_err(|_| PacketError::BadCountLength(buf.len()))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketError {
    /// Report shorter than the count field.
    BufferTooShort(usize),
    /// Count reply is not exactly four bytes.
    BadCountLength(usize),
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::BufferTooShort(n) => {
                write!(f, "report of {n} bytes is too short to contain a count")
            }
            PacketError::BadCountLength(n) => {
                write!(f, "count reply must be {COUNT_LEN} bytes, got {n}")
            }
        }
    }
}

impl std::error::Error for PacketError {}
