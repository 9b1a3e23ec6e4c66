//! Indicators used by the screening evaluators.
//!
//! Indicators are pure functions: bar history in, numeric series out, one
//! value per bar. The evaluators only read the tail of each series, but the
//! full series keeps indicators testable bar by bar.

pub mod channel;
pub mod sma;

pub use channel::{Channel, ChannelBand};
pub use sma::Sma;

use crate::domain::Bar;

/// Trait for indicators.
///
/// `compute` returns a `Vec<f64>` of the same length as `bars`; the first
/// `lookback()` values are `f64::NAN` (warmup). No value at bar t may depend on
/// bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_close_50").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Which bar field an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Close,
    Volume,
}

impl PriceField {
    pub fn read(self, bar: &Bar) -> f64 {
        match self {
            Self::Close => bar.close,
            Self::Volume => bar.volume as f64,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Volume => "volume",
        }
    }
}

/// Value `back` bars before the end of a series (0 = latest), if valid.
pub fn value_at(series: &[f64], back: usize) -> Option<f64> {
    let idx = series.len().checked_sub(back + 1)?;
    series.get(idx).copied().filter(|v| !v.is_nan())
}

/// Latest valid value of a series.
pub fn latest(series: &[f64]) -> Option<f64> {
    value_at(series, 0)
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev close (or close for the first bar), high = max(open, close) + 1,
/// low = min(open, close) - 1, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
