//! Swing Sniper Runner: scan orchestration on top of `sniper-core`.
//!
//! This crate provides:
//! - TOML scan configuration with validation and fingerprinting
//! - Universe loading from exchange screener CSV exports
//! - The sequential scan loop with throttle and cooperative cancellation
//! - Scan reports with ranking and skip tallies
//! - CSV / JSON export and a time-windowed report cache

pub mod cache;
pub mod config;
pub mod export;
pub mod report;
pub mod scanner;
pub mod universe;

pub use cache::ResultCache;
pub use config::{ConfigError, Fingerprint, ScanConfig};
pub use export::{export_csv, export_json, import_json, write_csv, write_json};
pub use report::{ScanReport, SCHEMA_VERSION};
pub use scanner::{run_scan, NoProgress, ScanError, ScanProgress};
pub use universe::{
    load_universe, load_universe_from_reader, select_symbols, UniverseError, UniverseFilter,
};
