//! Screening pipeline: technical, fundamental, relative strength, sizing.
//!
//! A [`Screener`] evaluates one symbol at a time against a provider. Stages run
//! in a fixed order and the first failing stage decides the skip reason:
//!
//! 1. history fetch
//! 2. technical template
//! 3. fundamentals (fundamental and full modes, fetched only after step 2 passes)
//! 4. annotations (full mode): relative strength, stop, position size, earnings risk
//!
//! Nothing here retries. Provider errors become [`SkipReason::FetchError`] or a
//! fundamental failure and the caller moves on to the next symbol.

pub mod earnings;
pub mod fundamental;
pub mod relative_strength;
pub mod result;
pub mod sizing;
pub mod technical;

pub use earnings::{classify_earnings, EarningsRisk};
pub use fundamental::{
    evaluate_fundamentals, AbsentField, FundamentalCheck, FundamentalFailure, FundamentalThresholds,
};
pub use relative_strength::{period_return, relative_strength, BenchmarkReturn, QUARTER_BARS};
pub use result::{
    reference_link, ScreeningResult, SkipReason, StatusLabel, SymbolOutcome, DEFAULT_LINK_TEMPLATE,
};
pub use sizing::{suggested_stop, PositionSizer, SizingError};
pub use technical::{
    evaluate_technical, volume_relative, Rejection, TechnicalMetrics, TechnicalOutcome,
    TechnicalThresholds,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{DataError, Lookback, MarketDataProvider};

/// Which stages a scan runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Technical template only.
    Technical,
    /// Technical plus fundamental thresholds.
    Fundamental,
    /// Fundamentals plus relative strength, stop, sizing and earnings risk.
    #[default]
    Full,
}

impl ScanMode {
    pub fn uses_fundamentals(self) -> bool {
        matches!(self, Self::Fundamental | Self::Full)
    }

    pub fn uses_annotations(self) -> bool {
        matches!(self, Self::Full)
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "technical" => Ok(Self::Technical),
            "fundamental" => Ok(Self::Fundamental),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown scan mode '{other}' (technical|fundamental|full)")),
        }
    }
}

/// Default stop buffer under the prior 20-bar low.
pub const DEFAULT_STOP_BUFFER: f64 = 0.02;

/// Default earnings proximity window, calendar days.
pub const DEFAULT_EARNINGS_WINDOW_DAYS: i64 = 14;

/// Per-symbol evaluator configured for one scan.
#[derive(Debug, Clone)]
pub struct Screener {
    mode: ScanMode,
    lookback: Lookback,
    technical: TechnicalThresholds,
    fundamental: FundamentalThresholds,
    sizer: Option<PositionSizer>,
    stop_buffer: f64,
    earnings_window_days: i64,
    link_template: String,
}

impl Screener {
    pub fn new(
        mode: ScanMode,
        technical: TechnicalThresholds,
        fundamental: FundamentalThresholds,
    ) -> Self {
        Self {
            mode,
            lookback: Lookback::OneYear,
            technical,
            fundamental,
            sizer: None,
            stop_buffer: DEFAULT_STOP_BUFFER,
            earnings_window_days: DEFAULT_EARNINGS_WINDOW_DAYS,
            link_template: DEFAULT_LINK_TEMPLATE.to_string(),
        }
    }

    pub fn with_sizer(mut self, sizer: PositionSizer, stop_buffer: f64) -> Self {
        self.sizer = Some(sizer);
        self.stop_buffer = stop_buffer;
        self
    }

    pub fn with_earnings_window(mut self, days: i64) -> Self {
        self.earnings_window_days = days;
        self
    }

    pub fn with_link_template(mut self, template: impl Into<String>) -> Self {
        self.link_template = template.into();
        self
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn lookback(&self) -> Lookback {
        self.lookback
    }

    /// Screen one symbol. `benchmark` is only read in full mode.
    pub fn evaluate(
        &self,
        symbol: &str,
        provider: &dyn MarketDataProvider,
        benchmark: Option<&BenchmarkReturn>,
    ) -> SymbolOutcome {
        let skip = |reason: SkipReason| SymbolOutcome::Skipped {
            symbol: symbol.to_string(),
            reason,
        };

        let bars = match provider.history(symbol, self.lookback) {
            Ok(bars) => bars,
            Err(e) => {
                return skip(SkipReason::FetchError {
                    message: e.to_string(),
                })
            }
        };

        let metrics = match evaluate_technical(&bars, &self.technical) {
            TechnicalOutcome::Qualified(m) => m,
            TechnicalOutcome::InsufficientHistory { bars, required } => {
                return skip(SkipReason::InsufficientHistory { bars, required })
            }
            TechnicalOutcome::Rejected { reason, .. } => {
                return skip(SkipReason::TechnicalReject { reason })
            }
        };

        let fundamentals = if self.mode.uses_fundamentals() {
            let check = match provider.fundamentals(symbol) {
                Ok(snapshot) => evaluate_fundamentals(&snapshot, &self.fundamental),
                Err(e) => {
                    debug!(symbol, error = %e, "fundamentals unavailable");
                    return skip(SkipReason::FundamentalFail {
                        failure: FundamentalFailure::Unavailable,
                    });
                }
            };
            if let Some(failure) = check.failure {
                return skip(SkipReason::FundamentalFail { failure });
            }
            Some(check)
        } else {
            None
        };

        let (stop_loss, position_size, rs, earnings_risk) = if self.mode.uses_annotations() {
            let stop = suggested_stop(metrics.low_20d_prior, self.stop_buffer);
            let size = self
                .sizer
                .as_ref()
                .map(|s| s.shares_to_buy(metrics.price, stop));
            let rs = benchmark.and_then(|b| b.relative_strength_of(&bars));
            let next = provider.next_earnings_date(symbol).unwrap_or_else(|e| {
                debug!(symbol, error = %e, "earnings date lookup failed");
                None
            });
            let risk = classify_earnings(metrics.as_of, next, self.earnings_window_days);
            (Some(stop), size, rs, risk)
        } else {
            (None, None, None, EarningsRisk::Unknown)
        };

        let status = StatusLabel::classify(metrics.breakout, fundamentals.is_some());

        SymbolOutcome::Qualified(ScreeningResult {
            symbol: symbol.to_string(),
            as_of: metrics.as_of,
            price: metrics.price,
            volume_relative: metrics.volume_relative,
            distance_from_200sma: metrics.distance_from_200sma,
            high_20d: metrics.high_20d_prior,
            low_20d: metrics.low_20d_prior,
            breakout: metrics.breakout,
            fundamentals,
            stop_loss,
            relative_strength: rs,
            position_size,
            earnings_risk,
            status,
            reference_link: reference_link(&self.link_template, symbol),
        })
    }
}

/// Fetch the benchmark history and compute its return over `window` bars.
pub fn fetch_benchmark(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    lookback: Lookback,
    window: usize,
) -> Result<BenchmarkReturn, DataError> {
    let bars = provider.history(symbol, lookback)?;
    let len = bars.len();
    BenchmarkReturn::from_history(symbol, &bars, window).ok_or_else(|| {
        DataError::InsufficientData {
            symbol: symbol.to_string(),
            bars: len,
            required: window + 1,
        }
    })
}
