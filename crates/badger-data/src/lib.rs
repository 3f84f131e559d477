//! Data layer for Badger.
//!
//! Responsible for fetching tabular results from the BI query service,
//! zipping them into typed records at the ingestion boundary, and running
//! the grouping / bucketing / aggregation / export pipeline over them.

pub mod bucketer;
pub mod client;
pub mod company;
pub mod export;
pub mod grouper;
pub mod ingest;
pub mod pipeline;
pub mod series;

pub use badger_core as core;
