//! Simple Moving Average (SMA).
//!
//! Rolling mean of a bar field over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::{Indicator, PriceField};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    field: PriceField,
    name: String,
}

impl Sma {
    /// SMA of `field`. A zero period is treated as 1.
    pub fn new(period: usize, field: PriceField) -> Self {
        let period = period.max(1);
        Self {
            period,
            field,
            name: format!("sma_{}_{period}", field.label()),
        }
    }

    /// SMA of closing prices.
    pub fn close(period: usize) -> Self {
        Self::new(period, PriceField::Close)
    }

    /// SMA of daily volume.
    pub fn volume(period: usize) -> Self {
        Self::new(period, PriceField::Volume)
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let values: Vec<f64> = bars.iter().map(|b| self.field.read(b)).collect();

        let mut sum: f64 = values[..self.period].iter().sum();
        let mut nan_in_window = values[..self.period].iter().any(|v| v.is_nan());
        if !nan_in_window {
            result[self.period - 1] = sum / self.period as f64;
        }

        for i in self.period..n {
            let leaving = values[i - self.period];
            let entering = values[i];

            if entering.is_nan() || leaving.is_nan() || nan_in_window {
                // Recompute so a NaN leaving the window stops poisoning the sum.
                let window = &values[(i + 1 - self.period)..=i];
                nan_in_window = window.iter().any(|v| v.is_nan());
                sum = window.iter().sum();
                if nan_in_window {
                    continue;
                }
            } else {
                sum = sum - leaving + entering;
            }

            result[i] = sum / self.period as f64;
        }

        result
    }
}
