//! Relative strength against a benchmark over a fixed bar window.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Trading days in the default comparison window (about one quarter).
pub const QUARTER_BARS: usize = 60;

/// Percent change of the close over the last `window` bars.
///
/// `None` when the history has `window` bars or fewer, or the starting close
/// is not positive.
pub fn period_return(bars: &[Bar], window: usize) -> Option<f64> {
    let now = bars.last()?.close;
    let then = bars.get(bars.len().checked_sub(window + 1)?)?.close;
    if !(then > 0.0) || now.is_nan() {
        return None;
    }
    Some((now - then) / then * 100.0)
}

/// Stock return minus benchmark return, in percentage points.
pub fn relative_strength(stock_return_pct: f64, benchmark_return_pct: f64) -> f64 {
    stock_return_pct - benchmark_return_pct
}

/// Benchmark return computed once per scan and shared by every symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReturn {
    pub symbol: String,
    pub window: usize,
    pub return_pct: f64,
}

impl BenchmarkReturn {
    /// Build from the benchmark history; `None` if it is too short.
    pub fn from_history(symbol: &str, bars: &[Bar], window: usize) -> Option<Self> {
        Some(Self {
            symbol: symbol.to_string(),
            window,
            return_pct: period_return(bars, window)?,
        })
    }

    /// Relative strength of a stock history against this benchmark.
    pub fn relative_strength_of(&self, bars: &[Bar]) -> Option<f64> {
        period_return(bars, self.window).map(|r| relative_strength(r, self.return_pct))
    }
}
