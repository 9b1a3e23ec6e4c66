//! Price channel: highest high / lowest low over a rolling window.
//!
//! With `exclude_current` the window at bar t is `[t-period, t-1]`, so a new
//! high on bar t cannot satisfy its own breakout test. Otherwise the window is
//! `[t-period+1, t]`.

use super::Indicator;
use crate::domain::Bar;

/// Which edge of the channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Channel {
    period: usize,
    band: ChannelBand,
    exclude_current: bool,
    name: String,
}

impl Channel {
    fn build(period: usize, band: ChannelBand, exclude_current: bool) -> Self {
        let period = period.max(1);
        let edge = match band {
            ChannelBand::Upper => "high",
            ChannelBand::Lower => "low",
        };
        let prefix = if exclude_current { "prior_" } else { "" };
        Self {
            period,
            band,
            exclude_current,
            name: format!("{prefix}{edge}_{period}"),
        }
    }

    /// Highest high of the last `period` bars, current bar included.
    pub fn upper(period: usize) -> Self {
        Self::build(period, ChannelBand::Upper, false)
    }

    /// Lowest low of the last `period` bars, current bar included.
    pub fn lower(period: usize) -> Self {
        Self::build(period, ChannelBand::Lower, false)
    }

    /// Highest high of the `period` bars before the current one.
    pub fn prior_upper(period: usize) -> Self {
        Self::build(period, ChannelBand::Upper, true)
    }

    /// Lowest low of the `period` bars before the current one.
    pub fn prior_lower(period: usize) -> Self {
        Self::build(period, ChannelBand::Lower, true)
    }
}

impl Indicator for Channel {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        if self.exclude_current {
            self.period
        } else {
            self.period - 1
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for (i, slot) in result.iter_mut().enumerate().skip(self.lookback()) {
            let end = if self.exclude_current { i } else { i + 1 };
            let window = &bars[end - self.period..end];

            let values = window.iter().map(|b| match self.band {
                ChannelBand::Upper => b.high,
                ChannelBand::Lower => b.low,
            });

            let mut acc = match self.band {
                ChannelBand::Upper => f64::NEG_INFINITY,
                ChannelBand::Lower => f64::INFINITY,
            };
            let mut has_nan = false;
            for v in values {
                if v.is_nan() {
                    has_nan = true;
                    break;
                }
                acc = match self.band {
                    ChannelBand::Upper => acc.max(v),
                    ChannelBand::Lower => acc.min(v),
                };
            }
            *slot = if has_nan { f64::NAN } else { acc };
        }

        result
    }
}
