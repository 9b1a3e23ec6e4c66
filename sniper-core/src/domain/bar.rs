//! Bar: one trading day of price/volume data for a symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV bar.
///
/// Histories are plain `Vec<Bar>` ordered ascending by date with no duplicate
/// dates. The symbol is carried by the caller, not the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// OHLC sanity check: high >= low, high >= max(open, close), low <= min(open, close).
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Structural problems with a price history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index} ({date}) is not after the previous bar")]
    OutOfOrder { index: usize, date: NaiveDate },

    #[error("bar {index} ({date}) violates the OHLC invariant")]
    Insane { index: usize, date: NaiveDate },
}

/// Check that a history is strictly ascending by date and every bar is sane.
pub fn validate_history(bars: &[Bar]) -> Result<(), BarError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(BarError::Insane {
                index,
                date: bar.date,
            });
        }
        if index > 0 && bar.date <= bars[index - 1].date {
            return Err(BarError::OutOfOrder {
                index,
                date: bar.date,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn history_must_be_ascending() {
        let first = sample_bar();
        let mut second = sample_bar();
        second.date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert!(validate_history(&[first.clone(), second.clone()]).is_ok());

        let err = validate_history(&[second, first.clone(), first]).unwrap_err();
        assert!(matches!(err, BarError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn duplicate_dates_rejected() {
        let bar = sample_bar();
        let err = validate_history(&[bar.clone(), bar]).unwrap_err();
        assert!(matches!(err, BarError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
