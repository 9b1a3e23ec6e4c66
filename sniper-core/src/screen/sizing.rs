//! Position sizing: fixed-fractional risk per trade.
//!
//! Sizers translate a risk budget into a share count. They do not decide
//! entries; the stop defaults to a buffer under the prior 20-bar low.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingError {
    #[error("account capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("risk percentage must be in (0, 100], got {0}")]
    InvalidRiskPct(f64),
}

/// Risk a fixed percentage of account capital per position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizer {
    account_capital: f64,
    risk_pct: f64,
}

impl PositionSizer {
    pub fn new(account_capital: f64, risk_pct: f64) -> Result<Self, SizingError> {
        if !(account_capital.is_finite() && account_capital > 0.0) {
            return Err(SizingError::InvalidCapital(account_capital));
        }
        if !(risk_pct > 0.0 && risk_pct <= 100.0) {
            return Err(SizingError::InvalidRiskPct(risk_pct));
        }
        Ok(Self {
            account_capital,
            risk_pct,
        })
    }

    pub fn account_capital(&self) -> f64 {
        self.account_capital
    }

    pub fn risk_pct(&self) -> f64 {
        self.risk_pct
    }

    /// Dollars at risk per position.
    pub fn risk_budget(&self) -> f64 {
        self.account_capital * (self.risk_pct / 100.0)
    }

    /// Whole shares such that hitting the stop loses at most the risk budget.
    ///
    /// 0 when the stop is at or above the entry.
    pub fn shares_to_buy(&self, entry_price: f64, stop_loss_price: f64) -> u64 {
        let per_share_risk = entry_price - stop_loss_price;
        if !(per_share_risk.is_finite() && per_share_risk > 0.0) {
            return 0;
        }
        (self.risk_budget() / per_share_risk).floor() as u64
    }
}

/// Stop placed `buffer` (fraction) below a reference low.
pub fn suggested_stop(reference_low: f64, buffer: f64) -> f64 {
    reference_low * (1.0 - buffer)
}
