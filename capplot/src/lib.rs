//! `capplot` — chart a `"<timestamp>, <value>"` log in the terminal.
//!
//! - [`series`] — parse the log into x/y points, x normalized to start at 0
//! - [`chart`]  — ratatui line chart of a [`Series`]

pub mod chart;
pub mod series;

pub use series::{PlotError, Series};
