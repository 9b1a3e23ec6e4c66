//! Offline provider reading a directory of CSV files.
//!
//! Layout:
//! - `<dir>/<SYMBOL>.csv` with columns `date,open,high,low,close,volume`
//! - optional `<dir>/fundamentals.csv` with columns
//!   `symbol,market_cap,revenue_growth,earnings_growth,next_earnings`
//!   (empty cells mean "not reported")

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{trim_to_lookback, DataError, DataSource, Lookback, MarketDataProvider};
use crate::domain::{validate_history, Bar, FundamentalSnapshot};

#[derive(Debug, Deserialize)]
struct FundamentalRecord {
    symbol: String,
    market_cap: f64,
    revenue_growth: Option<f64>,
    earnings_growth: Option<f64>,
    next_earnings: Option<NaiveDate>,
}

/// Provider backed by a directory of per-symbol CSV files.
pub struct CsvDirProvider {
    dir: PathBuf,
    fundamentals: HashMap<String, (FundamentalSnapshot, Option<NaiveDate>)>,
}

impl CsvDirProvider {
    /// Open a data directory. `fundamentals.csv` is loaded eagerly if present.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DataError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(DataError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("data directory not found: {}", dir.display()),
            )));
        }
        let dir = dir.canonicalize().unwrap_or(dir);

        let mut fundamentals = HashMap::new();
        let path = dir.join("fundamentals.csv");
        if path.exists() {
            let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(&path)?;
            for record in rdr.deserialize() {
                let record: FundamentalRecord = record?;
                fundamentals.insert(
                    record.symbol.to_uppercase(),
                    (
                        FundamentalSnapshot::new(
                            record.market_cap,
                            record.revenue_growth,
                            record.earnings_growth,
                        ),
                        record.next_earnings,
                    ),
                );
            }
        }

        Ok(Self { dir, fundamentals })
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }
}

impl MarketDataProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv_directory"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvDirectory
    }

    fn identity(&self) -> String {
        format!("{}:{}", self.name(), self.dir.display())
    }

    fn history(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, DataError> {
        let path = self.symbol_path(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(&path)?;
        let mut bars = Vec::new();
        for record in rdr.deserialize() {
            let bar: Bar = record?;
            bars.push(bar);
        }

        validate_history(&bars).map_err(|e| DataError::ValidationError(format!("{symbol}: {e}")))?;
        Ok(trim_to_lookback(bars, lookback))
    }

    fn fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        self.fundamentals
            .get(&symbol.to_uppercase())
            .map(|(snap, _)| snap.clone())
            .ok_or_else(|| DataError::NoFundamentals {
                symbol: symbol.to_string(),
            })
    }

    fn next_earnings_date(&self, symbol: &str) -> Result<Option<NaiveDate>, DataError> {
        Ok(self
            .fundamentals
            .get(&symbol.to_uppercase())
            .and_then(|(_, date)| *date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("ACME.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-02,10.0,10.5,9.5,10.2,1000\n\
             2024-01-03,10.2,10.9,10.0,10.8,1500\n",
        )
        .unwrap();
        fs::write(
            dir.join("fundamentals.csv"),
            "symbol,market_cap,revenue_growth,earnings_growth,next_earnings\n\
             ACME,2500000000,0.30,,2024-02-01\n",
        )
        .unwrap();
    }

    #[test]
    fn identity_names_the_directory() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let pa = CsvDirProvider::open(a.path()).unwrap();
        let pb = CsvDirProvider::open(b.path()).unwrap();
        assert!(pa.identity().starts_with("csv_directory:"));
        assert_ne!(pa.identity(), pb.identity());
        assert_eq!(pa.identity(), CsvDirProvider::open(a.path()).unwrap().identity());
    }

    #[test]
    fn reads_history_and_fundamentals() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let provider = CsvDirProvider::open(tmp.path()).unwrap();

        let bars = provider.history("acme", Lookback::OneYear).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 10.8);

        let snap = provider.fundamentals("ACME").unwrap();
        assert_eq!(snap.revenue_growth, Some(0.30));
        assert_eq!(snap.earnings_growth, None);
        assert_eq!(
            provider.next_earnings_date("ACME").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }

    #[test]
    fn missing_symbol_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = CsvDirProvider::open(tmp.path()).unwrap();
        let err = provider.history("NONE", Lookback::OneYear).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
        assert!(matches!(
            provider.fundamentals("NONE").unwrap_err(),
            DataError::NoFundamentals { .. }
        ));
    }

    #[test]
    fn unordered_history_is_a_validation_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("BAD.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-03,10.0,10.5,9.5,10.2,1000\n\
             2024-01-02,10.2,10.9,10.0,10.8,1500\n",
        )
        .unwrap();
        let provider = CsvDirProvider::open(tmp.path()).unwrap();
        let err = provider.history("BAD", Lookback::OneYear).unwrap_err();
        assert!(matches!(err, DataError::ValidationError(_)));
    }

    #[test]
    fn missing_directory_fails_to_open() {
        assert!(CsvDirProvider::open("/definitely/not/here").is_err());
    }
}
