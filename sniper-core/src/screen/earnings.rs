//! Earnings-date proximity annotation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How close the next earnings report is to the evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EarningsRisk {
    /// No upcoming date known (not reported, stale, or lookup failed).
    Unknown,
    /// Next report is outside the window.
    Clear { days_until: i64 },
    /// Next report falls inside the window.
    Imminent { days_until: i64 },
}

impl EarningsRisk {
    pub fn label(&self) -> String {
        match self {
            Self::Unknown => "unknown".into(),
            Self::Clear { days_until } => format!("clear ({days_until}d)"),
            Self::Imminent { days_until } => format!("imminent ({days_until}d)"),
        }
    }
}

/// Classify the next earnings date against `as_of` and a window in calendar days.
pub fn classify_earnings(as_of: NaiveDate, next: Option<NaiveDate>, window_days: i64) -> EarningsRisk {
    let Some(next) = next else {
        return EarningsRisk::Unknown;
    };
    let days_until = (next - as_of).num_days();
    if days_until < 0 {
        EarningsRisk::Unknown
    } else if days_until <= window_days {
        EarningsRisk::Imminent { days_until }
    } else {
        EarningsRisk::Clear { days_until }
    }
}
