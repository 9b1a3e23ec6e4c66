//! Universe loading from an exchange screener export.
//!
//! The file needs `Symbol`, `Last Sale` and `Volume` columns. Header names are
//! trimmed and matched case-insensitively; extra columns are ignored. Prices
//! may be currency formatted (`$1,234.50`). Any malformed row fails the whole
//! load: a scan never runs on a half-read universe.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use sniper_core::domain::UniverseRow;

pub const SYMBOL_COLUMN: &str = "Symbol";
pub const PRICE_COLUMN: &str = "Last Sale";
pub const VOLUME_COLUMN: &str = "Volume";

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to open universe file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed universe file: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: invalid {column} value '{value}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Price/volume pre-filter and optional prefix cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseFilter {
    pub min_price: f64,
    pub min_volume: u64,
    pub max_symbols: Option<usize>,
}

/// Parse a price cell, stripping `$` and thousands separators.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let value: f64 = cleaned.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Parse a volume cell. Accepts thousands separators and whole floats ("1200.0").
pub fn parse_volume(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if let Ok(v) = cleaned.parse::<u64>() {
        return Some(v);
    }
    let v: f64 = cleaned.parse().ok()?;
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
}

fn column_index(headers: &csv::StringRecord, name: &'static str) -> Result<usize, UniverseError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or(UniverseError::MissingColumn(name))
}

/// Load universe rows from any reader.
pub fn load_universe_from_reader<R: Read>(reader: R) -> Result<Vec<UniverseRow>, UniverseError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let symbol_idx = column_index(&headers, SYMBOL_COLUMN)?;
    let price_idx = column_index(&headers, PRICE_COLUMN)?;
    let volume_idx = column_index(&headers, VOLUME_COLUMN)?;

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Row numbers are 1-based and count the header line.
        let row = i + 2;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let symbol = cell(symbol_idx).trim();
        if symbol.is_empty() {
            return Err(UniverseError::InvalidValue {
                row,
                column: SYMBOL_COLUMN,
                value: String::new(),
            });
        }
        let last_price = parse_price(cell(price_idx)).ok_or_else(|| UniverseError::InvalidValue {
            row,
            column: PRICE_COLUMN,
            value: cell(price_idx).to_string(),
        })?;
        let volume = parse_volume(cell(volume_idx)).ok_or_else(|| UniverseError::InvalidValue {
            row,
            column: VOLUME_COLUMN,
            value: cell(volume_idx).to_string(),
        })?;

        rows.push(UniverseRow {
            symbol: symbol.to_string(),
            last_price,
            volume,
        });
    }
    Ok(rows)
}

/// Load universe rows from a CSV file.
pub fn load_universe(path: &Path) -> Result<Vec<UniverseRow>, UniverseError> {
    let file = std::fs::File::open(path).map_err(|source| UniverseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = load_universe_from_reader(file)?;
    info!(path = %path.display(), rows = rows.len(), "loaded universe");
    Ok(rows)
}

/// Apply the price/volume filter, then keep the first `max_symbols`.
///
/// Order is preserved and duplicates are kept.
pub fn select_symbols(rows: &[UniverseRow], filter: &UniverseFilter) -> Vec<String> {
    let passing = rows
        .iter()
        .filter(|r| r.last_price >= filter.min_price && r.volume >= filter.min_volume)
        .map(|r| r.symbol.clone());
    match filter.max_symbols {
        Some(cap) => passing.take(cap).collect(),
        None => passing.collect(),
    }
}
