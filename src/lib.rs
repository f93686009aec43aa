//! Hands-on GUI exercises built on iced.
//!
//! - [`counter`]: two buttons mutating a displayed integer.
//! - [`graph`]: a temperature chart with clear/draw/add controls.
//! - [`serial`] and [`connection`]: a serial-port connection manager whose
//!   blocking device access runs on a background worker.
//!
//! Each exercise has its own binary under `src/bin/`.

pub mod config;
pub mod connection;
pub mod counter;
pub mod error;
pub mod graph;
pub mod logging;
pub mod serial;

pub use error::HandsOnError;

/// Window title shared by all exercises.
pub const WINDOW_TITLE: &str = "GUI";
