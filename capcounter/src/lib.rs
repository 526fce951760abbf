//! `capcounter` — keeps a device's cumulative cap count over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  report / query  ┌──────────┐
//!  │  Device  │─────────────────▶│  Server  │
//!  └──────────┘◀─────────────────└────┬─────┘
//!                 4-byte count        │ accept / save
//!                                ┌────▼─────┐
//!                                │   Caps   │  (count + pending timestamps)
//!                                └────┬─────┘
//!                                     │ rows
//!                                ┌────▼─────┐
//!                                │  Store   │  CSV file or InfluxDB
//!                                └──────────┘
//! ```
//!
//! - [`packet`]  — wire format (little-endian report and count reply)
//! - [`socket`]  — async UDP socket abstraction
//! - [`store`]   — persistence trait and its two backends
//! - [`caps`]    — counter state and flush logic
//! - [`server`]  — single-task listener loop
//! - [`rawlog`]  — text logger writing `capplot` input
//! - [`client`]  — count query and report sender

pub mod caps;
pub mod client;
pub mod packet;
pub mod rawlog;
pub mod server;
pub mod socket;
pub mod store;

pub use caps::{Acceptance, Caps};
pub use packet::{CapRecord, Report};
pub use server::ServerError;
pub use store::{CapRow, CsvStore, InfluxStore, Store, StoreConfig, StoreError};
