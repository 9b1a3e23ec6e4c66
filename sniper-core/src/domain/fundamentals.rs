//! Fundamental snapshot for a single symbol.

use serde::{Deserialize, Serialize};

/// Point-in-time fundamentals as reported by the data provider.
///
/// Growth figures are fractions (0.25 = 25%). A provider that does not report
/// a growth figure leaves it `None`; the fundamental evaluator decides what
/// absence means.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    /// Market capitalization in dollars.
    pub market_cap: f64,
    /// Trailing revenue growth as a fraction.
    pub revenue_growth: Option<f64>,
    /// Trailing earnings growth as a fraction.
    pub earnings_growth: Option<f64>,
}

impl FundamentalSnapshot {
    pub fn new(market_cap: f64, revenue_growth: Option<f64>, earnings_growth: Option<f64>) -> Self {
        Self {
            market_cap,
            revenue_growth,
            earnings_growth,
        }
    }

    /// Market cap in billions of dollars.
    pub fn market_cap_billions(&self) -> f64 {
        self.market_cap / 1e9
    }
}
