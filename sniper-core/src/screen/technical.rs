//! Technical evaluator: Stage 2 uptrend with institutional volume.
//!
//! All metrics are taken as of the most recent bar. A symbol qualifies when,
//! in order:
//! 1. price > SMA150, price > SMA200 and SMA150 > SMA200
//! 2. SMA200 is above its value one bar earlier
//! 3. price >= K × highest high of the retrieved history
//! 4. (optional) distance above SMA200 stays below the extension cap
//!
//! The breakout flag is informational: relative volume above the breakout
//! ratio and a close above the prior 20-bar high.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{latest, value_at, Channel, Indicator, Sma};

/// Parameters of the technical filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalThresholds {
    /// Histories shorter than this are skipped outright.
    pub min_history_bars: usize,
    pub fast_period: usize,
    pub mid_period: usize,
    pub slow_period: usize,
    pub volume_period: usize,
    /// K: price must be at least this fraction of the period high.
    pub proximity_to_high: f64,
    /// Maximum (price - SMA200) / SMA200; `None` disables the guard.
    pub extension_cap: Option<f64>,
    /// Relative volume above which a close over the prior high is a breakout.
    pub breakout_volume_ratio: f64,
    /// Bars in the prior-high / prior-low window.
    pub breakout_window: usize,
}

impl TechnicalThresholds {
    /// Standard 50/150/200 trend template with a 50-day volume average and
    /// 20-bar breakout window.
    pub fn new(proximity_to_high: f64, extension_cap: Option<f64>, breakout_volume_ratio: f64) -> Self {
        Self {
            min_history_bars: 200,
            fast_period: 50,
            mid_period: 150,
            slow_period: 200,
            volume_period: 50,
            proximity_to_high,
            extension_cap,
            breakout_volume_ratio,
            breakout_window: 20,
        }
    }
}

/// Why a symbol with enough history did not qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Price not above SMA150/SMA200, or SMA150 not above SMA200.
    TrendAlignment,
    /// SMA200 flat or falling.
    LongTrendNotRising,
    /// Price too far below the period high.
    FarFromHigh,
    /// Price too far above SMA200.
    Overextended,
    /// A required value could not be computed (NaN in the data).
    MissingData,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TrendAlignment => "trend alignment",
            Self::LongTrendNotRising => "200-day average not rising",
            Self::FarFromHigh => "too far from period high",
            Self::Overextended => "overextended above 200-day average",
            Self::MissingData => "missing data",
        };
        f.write_str(s)
    }
}

/// Everything the technical evaluator computes for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalMetrics {
    pub as_of: NaiveDate,
    pub price: f64,
    pub sma_fast: f64,
    pub sma_mid: f64,
    pub sma_slow: f64,
    pub sma_slow_prev: f64,
    pub volume: u64,
    pub volume_avg: f64,
    pub volume_relative: f64,
    pub high_52w: f64,
    pub high_20d_prior: f64,
    pub low_20d_prior: f64,
    /// (price - SMA200) / SMA200 as a fraction.
    pub distance_from_200sma: f64,
    pub breakout: bool,
}

/// Result of evaluating one history.
#[derive(Debug, Clone, PartialEq)]
pub enum TechnicalOutcome {
    InsufficientHistory { bars: usize, required: usize },
    Rejected {
        reason: Rejection,
        metrics: Option<TechnicalMetrics>,
    },
    Qualified(TechnicalMetrics),
}

impl TechnicalOutcome {
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified(_))
    }
}

/// Relative volume, 0 when the average is 0.
pub fn volume_relative(volume: u64, average: f64) -> f64 {
    if average > 0.0 {
        volume as f64 / average
    } else {
        0.0
    }
}

/// Compute the metrics as of the last bar. `None` if any required value is NaN
/// or the history is shorter than the slow period.
pub fn compute_metrics(bars: &[Bar], t: &TechnicalThresholds) -> Option<TechnicalMetrics> {
    let last = bars.last()?;
    if bars.len() < t.slow_period {
        return None;
    }

    let sma_slow_series = Sma::close(t.slow_period).compute(bars);
    let sma_slow = latest(&sma_slow_series)?;
    // With exactly `slow_period` bars the prior average uses the bars available.
    let sma_slow_prev = match value_at(&sma_slow_series, 1) {
        Some(v) => v,
        None => {
            let prior = &bars[..bars.len() - 1];
            if prior.is_empty() {
                return None;
            }
            prior.iter().map(|b| b.close).sum::<f64>() / prior.len() as f64
        }
    };

    let sma_fast = latest(&Sma::close(t.fast_period).compute(bars))?;
    let sma_mid = latest(&Sma::close(t.mid_period).compute(bars))?;
    let volume_avg = latest(&Sma::volume(t.volume_period).compute(bars))?;
    let high_20d_prior = latest(&Channel::prior_upper(t.breakout_window).compute(bars))?;
    let low_20d_prior = latest(&Channel::prior_lower(t.breakout_window).compute(bars))?;

    let high_52w = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let price = last.close;
    if price.is_nan() || sma_slow_prev.is_nan() || !high_52w.is_finite() {
        return None;
    }

    let distance_from_200sma = if sma_slow > 0.0 {
        (price - sma_slow) / sma_slow
    } else {
        0.0
    };
    let vol_rel = volume_relative(last.volume, volume_avg);

    Some(TechnicalMetrics {
        as_of: last.date,
        price,
        sma_fast,
        sma_mid,
        sma_slow,
        sma_slow_prev,
        volume: last.volume,
        volume_avg,
        volume_relative: vol_rel,
        high_52w,
        high_20d_prior,
        low_20d_prior,
        distance_from_200sma,
        breakout: vol_rel > t.breakout_volume_ratio && price > high_20d_prior,
    })
}

/// First failing qualification predicate, if any.
pub fn first_rejection(m: &TechnicalMetrics, t: &TechnicalThresholds) -> Option<Rejection> {
    if !(m.price > m.sma_mid && m.price > m.sma_slow && m.sma_mid > m.sma_slow) {
        return Some(Rejection::TrendAlignment);
    }
    if m.sma_slow <= m.sma_slow_prev {
        return Some(Rejection::LongTrendNotRising);
    }
    if m.price < t.proximity_to_high * m.high_52w {
        return Some(Rejection::FarFromHigh);
    }
    if let Some(cap) = t.extension_cap {
        if m.distance_from_200sma >= cap {
            return Some(Rejection::Overextended);
        }
    }
    None
}

/// Evaluate one symbol's history.
pub fn evaluate_technical(bars: &[Bar], t: &TechnicalThresholds) -> TechnicalOutcome {
    let required = t.min_history_bars.max(t.slow_period);
    if bars.len() < required {
        return TechnicalOutcome::InsufficientHistory {
            bars: bars.len(),
            required,
        };
    }

    let Some(metrics) = compute_metrics(bars, t) else {
        return TechnicalOutcome::Rejected {
            reason: Rejection::MissingData,
            metrics: None,
        };
    };

    match first_rejection(&metrics, t) {
        Some(reason) => TechnicalOutcome::Rejected {
            reason,
            metrics: Some(metrics),
        },
        None => TechnicalOutcome::Qualified(metrics),
    }
}
