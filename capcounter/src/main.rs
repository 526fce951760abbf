//! Entry point for `capcounter`.
//!
//! Parses CLI arguments and dispatches into **serve**, **log** or **query**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, signal handling, argument parsing).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use capcounter::{client, rawlog, server, StoreConfig};

/// Cumulative cap counter over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Csv,
    Influx,
}

#[derive(Subcommand)]
enum Mode {
    /// Count reported caps and answer count queries.
    Serve {
        /// Local address to bind.
        #[arg(short, long, env = "CAPCOUNTER_BIND", default_value = "0.0.0.0:4444")]
        bind: SocketAddr,
        /// Where caps are persisted.
        #[arg(long, env = "CAPCOUNTER_STORE", value_enum, default_value_t = Backend::Csv)]
        store: Backend,
        /// CSV file for the csv store.
        #[arg(long, env = "CAPCOUNTER_CSV", default_value = "caps.csv")]
        csv_path: PathBuf,
        /// InfluxDB base URL for the influx store.
        #[arg(long, env = "CAPCOUNTER_INFLUX_URL", default_value = "http://localhost:8086")]
        influx_url: String,
        /// InfluxDB database for the influx store.
        #[arg(long, env = "CAPCOUNTER_INFLUX_DB", default_value = "mydb")]
        influx_db: String,
    },
    /// Append every datagram, with its arrival time, to a log file.
    Log {
        /// Local address to bind.
        #[arg(short, long, env = "CAPCOUNTER_BIND", default_value = "0.0.0.0:4444")]
        bind: SocketAddr,
        /// Directory for `<unix seconds>.log` files.
        #[arg(short, long, default_value = "logs")]
        dir: PathBuf,
    },
    /// Ask a running server for its count.
    Query {
        /// Server address.
        #[arg(short, long, default_value = "127.0.0.1:4444")]
        server: SocketAddr,
        /// How long to wait for the reply.
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
}

/// Resolves on ctrl-c.  If the handler cannot be installed, never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("interrupted, closing");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Serve {
            bind,
            store,
            csv_path,
            influx_url,
            influx_db,
        } => {
            let store = match store {
                Backend::Csv => StoreConfig::Csv { path: csv_path },
                Backend::Influx => StoreConfig::Influx {
                    url: influx_url,
                    database: influx_db,
                },
            };
            server::run(bind, store, interrupted())
                .await
                .context("cap server failed")?;
        }
        Mode::Log { bind, dir } => {
            let path = rawlog::run(bind, &dir, interrupted())
                .await
                .with_context(|| format!("raw logger on {bind} failed"))?;
            log::info!("log written to {}", path.display());
        }
        Mode::Query { server, timeout_ms } => {
            let count = client::query_count(server, Duration::from_millis(timeout_ms))
                .await
                .with_context(|| format!("querying {server}"))?;
            println!("{count}");
        }
    }

    Ok(())
}
