//! Per-symbol screening outcome.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::earnings::EarningsRisk;
use super::fundamental::{FundamentalCheck, FundamentalFailure};
use super::technical::Rejection;

/// Quote page used when no template is configured.
pub const DEFAULT_LINK_TEMPLATE: &str = "https://finance.yahoo.com/quote/{symbol}";

/// Fill `{symbol}` in a URL template.
pub fn reference_link(template: &str, symbol: &str) -> String {
    template.replace("{symbol}", symbol)
}

/// Display label of a qualifying symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusLabel {
    /// Passed the trend template, no breakout today.
    Trend,
    /// Trend plus a high-volume close over the prior 20-bar high.
    Breakout,
    /// Breakout that also passed the fundamental stage.
    BreakoutQuality,
}

impl StatusLabel {
    pub fn classify(breakout: bool, fundamentals_passed: bool) -> Self {
        match (breakout, fundamentals_passed) {
            (true, true) => Self::BreakoutQuality,
            (true, false) => Self::Breakout,
            (false, _) => Self::Trend,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trend => "Trend",
            Self::Breakout => "Breakout",
            Self::BreakoutQuality => "Breakout+Quality",
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One qualifying symbol. Built once by the screener and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub price: f64,
    pub volume_relative: f64,
    /// (price - SMA200) / SMA200 as a fraction.
    pub distance_from_200sma: f64,
    pub high_20d: f64,
    pub low_20d: f64,
    pub breakout: bool,
    /// Present when the fundamental stage ran.
    pub fundamentals: Option<FundamentalCheck>,
    pub stop_loss: Option<f64>,
    /// Percentage points over the benchmark.
    pub relative_strength: Option<f64>,
    pub position_size: Option<u64>,
    pub earnings_risk: EarningsRisk,
    pub status: StatusLabel,
    pub reference_link: String,
}

/// Why a symbol produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientHistory { bars: usize, required: usize },
    FetchError { message: String },
    TechnicalReject { reason: Rejection },
    FundamentalFail { failure: FundamentalFailure },
}

impl SkipReason {
    /// Stable short key, used for skip tallies.
    pub fn key(&self) -> &'static str {
        match self {
            Self::InsufficientHistory { .. } => "insufficient_history",
            Self::FetchError { .. } => "fetch_error",
            Self::TechnicalReject { .. } => "technical_reject",
            Self::FundamentalFail { .. } => "fundamental_fail",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientHistory { bars, required } => {
                write!(f, "insufficient history ({bars} of {required} bars)")
            }
            Self::FetchError { message } => write!(f, "fetch error: {message}"),
            Self::TechnicalReject { reason } => write!(f, "technical: {reason}"),
            Self::FundamentalFail { failure } => write!(f, "fundamental: {failure}"),
        }
    }
}

/// Result of screening one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SymbolOutcome {
    Qualified(ScreeningResult),
    Skipped { symbol: String, reason: SkipReason },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Qualified(r) => &r.symbol,
            Self::Skipped { symbol, .. } => symbol,
        }
    }

    pub fn result(&self) -> Option<&ScreeningResult> {
        match self {
            Self::Qualified(r) => Some(r),
            Self::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Self::Qualified(_) => None,
            Self::Skipped { reason, .. } => Some(reason),
        }
    }
}
