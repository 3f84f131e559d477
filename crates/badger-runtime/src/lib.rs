//! Runtime layer for Badger: TTL-cached orchestration of fetch and
//! transform, with per-publisher refresh.

pub mod data_manager;

pub use data_manager::DataManager;
