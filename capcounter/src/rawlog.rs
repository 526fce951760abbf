//! Raw datagram logger.
//!
//! An alternative to the counting listener for bring-up: every datagram is
//! written verbatim, as text, next to its arrival time.  The output is the
//! `"<seconds>, <value>"` format `capplot` reads, so a device that sends its
//! count as ASCII can be charted directly.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWriteExt;

use crate::socket::Socket;

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// One log line: arrival time in fractional seconds, then the payload.
pub fn format_line(arrival: f64, data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    format!("{arrival}, {}\n", text.trim_end_matches(['\r', '\n']))
}

/// `<dir>/<unix seconds>.log`
pub fn log_path(dir: &Path) -> PathBuf {
    let secs = now() as u64;
    dir.join(format!("{secs}.log"))
}

/// Append every datagram received on `socket` to `path` until `shutdown`.
///
/// Returns the number of lines written.
pub async fn log_datagrams<F>(socket: &Socket, path: &Path, shutdown: F) -> io::Result<usize>
where
    F: Future<Output = ()>,
{
    let mut file = tokio::fs::File::create(path).await?;
    tokio::pin!(shutdown);
    let mut lines = 0;

    loop {
        tokio::select! {
            result = socket.recv_from() => {
                let (data, src) = result?;
                let line = format_line(now(), &data);
                log::info!("{src}: {}", line.trim_end());
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
                lines += 1;
            }
            _ = &mut shutdown => break,
        }
    }

    log::info!("closing {} after {lines} lines", path.display());
    Ok(lines)
}

/// Bind `bind`, create `dir` if needed, and log into a fresh file there.
pub async fn run<F>(bind: SocketAddr, dir: &Path, shutdown: F) -> io::Result<PathBuf>
where
    F: Future<Output = ()>,
{
    tokio::fs::create_dir_all(dir).await?;
    let path = log_path(dir);
    let socket = Socket::bind(bind).await?;
    log::info!("starting raw logger on {}, logfile {}", socket.local_addr, path.display());
    log_datagrams(&socket, &path, shutdown).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_is_time_comma_space_payload() {
        assert_eq!(format_line(1.5, b"106359"), "1.5, 106359\n");
    }

    #[test]
    fn trailing_newline_in_payload_is_dropped() {
        assert_eq!(format_line(2.0, b"7\r\n"), "2, 7\n");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(format_line(0.25, &[b'4', 0xff]), "0.25, 4\u{fffd}\n");
    }

    #[test]
    fn log_path_is_named_after_current_second() {
        let path = log_path(Path::new("logs"));
        assert_eq!(path.parent(), Some(Path::new("logs")));
        let stem = path.file_stem().unwrap().to_str().unwrap();
        assert!(stem.parse::<u64>().unwrap() > 1_600_000_000);
        assert_eq!(path.extension().unwrap(), "log");
    }
}
