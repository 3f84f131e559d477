//! Core domain types and calculations for Badger.
//!
//! Holds the typed data model (publishers, period keys, metrics), the
//! trend-slope math, unit conversion helpers, the error taxonomy and the
//! CLI settings. Nothing in this crate touches the network or filesystem.

pub mod error;
pub mod models;
pub mod settings;
pub mod trend;
pub mod units;
