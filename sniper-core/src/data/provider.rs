//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over data sources (Yahoo Finance, a
//! directory of CSV files, synthetic bars) so the scan loop can swap
//! implementations and tests can inject fakes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, FundamentalSnapshot};

/// Structured error types for data operations.
///
/// Within a scan these never abort the run: the scanner turns them into a
/// per-symbol skip.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("provider refused the request: {0}")]
    Unauthorized(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no fundamentals available for '{symbol}'")]
    NoFundamentals { symbol: String },

    #[error("insufficient data for '{symbol}': {bars} bars, need {required}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        required: usize,
    },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// How much daily history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookback {
    /// Roughly 252 trading days.
    OneYear,
    /// Roughly 126 trading days.
    SixMonths,
}

impl Lookback {
    /// Approximate number of trading days covered.
    pub fn trading_days(self) -> usize {
        match self {
            Self::OneYear => 252,
            Self::SixMonths => 126,
        }
    }

    /// Yahoo-style range token.
    pub fn range_token(self) -> &'static str {
        match self {
            Self::OneYear => "1y",
            Self::SixMonths => "6mo",
        }
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvDirectory,
    Synthetic,
}

/// Trait for market data providers.
///
/// Every call is blocking. Implementations handle the specifics of a source;
/// throttling between symbols is the scanner's job.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Which source this provider reads from.
    fn source(&self) -> DataSource;

    /// Stable description of the data this provider serves, including any
    /// location or anchor date. Two providers with the same identity return
    /// the same data, so it is part of the result cache key.
    fn identity(&self) -> String {
        self.name().to_string()
    }

    /// Daily bars for `symbol`, ascending by date, covering up to `lookback`.
    fn history(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, DataError>;

    /// Current fundamental snapshot for `symbol`.
    fn fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError>;

    /// Next scheduled earnings date, if the provider knows one.
    fn next_earnings_date(&self, _symbol: &str) -> Result<Option<NaiveDate>, DataError> {
        Ok(None)
    }

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// Keep the last `lookback.trading_days()` bars of an ascending history.
pub fn trim_to_lookback(mut bars: Vec<Bar>, lookback: Lookback) -> Vec<Bar> {
    let keep = lookback.trading_days();
    if bars.len() > keep {
        bars.drain(..bars.len() - keep);
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(n: usize) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 100,
            })
            .collect()
    }

    #[test]
    fn trim_keeps_most_recent_bars() {
        let trimmed = trim_to_lookback(bars(300), Lookback::OneYear);
        assert_eq!(trimmed.len(), 252);
        assert_eq!(
            trimmed.last().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(299)
        );
    }

    #[test]
    fn trim_leaves_short_histories_alone() {
        assert_eq!(trim_to_lookback(bars(100), Lookback::SixMonths).len(), 100);
    }

    #[test]
    fn range_tokens() {
        assert_eq!(Lookback::OneYear.range_token(), "1y");
        assert_eq!(Lookback::SixMonths.range_token(), "6mo");
    }
}
