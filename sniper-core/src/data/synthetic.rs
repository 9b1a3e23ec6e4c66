//! Synthetic data provider for development and demos.
//!
//! Produces a deterministic random walk per symbol, seeded from a BLAKE3 hash
//! of the symbol name, so repeated scans see identical data. Each symbol gets
//! its own drift, so a universe contains both trending and drifting names.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataSource, Lookback, MarketDataProvider};
use crate::domain::{Bar, FundamentalSnapshot};

/// Deterministic random-walk provider.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    end: NaiveDate,
}

impl SyntheticProvider {
    /// Bars end on `end` (weekends skipped).
    pub fn new(end: NaiveDate) -> Self {
        Self { end }
    }

    fn rng_for(symbol: &str, salt: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.to_uppercase().as_bytes());
        hasher.update(salt.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    fn trading_days(&self, count: usize) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count);
        let mut current = self.end;
        while days.len() < count {
            let weekday = current.weekday();
            if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
                days.push(current);
            }
            current -= chrono::Duration::days(1);
        }
        days.reverse();
        days
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn identity(&self) -> String {
        format!("{}:{}", self.name(), self.end)
    }

    fn history(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, DataError> {
        let mut rng = Self::rng_for(symbol, "bars");
        let drift: f64 = rng.gen_range(-0.002..0.004);
        let base_volume: u64 = rng.gen_range(200_000..3_000_000);
        let mut price: f64 = rng.gen_range(15.0..250.0);

        let bars = self
            .trading_days(lookback.trading_days())
            .into_iter()
            .map(|date| {
                let daily_return: f64 = drift + rng.gen_range(-0.02..0.02);
                let open = price;
                let close = (price * (1.0 + daily_return)).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = (base_volume as f64 * rng.gen_range(0.5..2.0)) as u64;
                price = close;
                Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }
            })
            .collect();

        Ok(bars)
    }

    fn fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        let mut rng = Self::rng_for(symbol, "fundamentals");
        Ok(FundamentalSnapshot::new(
            rng.gen_range(0.2e9..80e9),
            Some(rng.gen_range(-0.10..0.60)),
            Some(rng.gen_range(-0.20..0.80)),
        ))
    }
}
