//! Fundamental evaluator: minimum size and growth.

use serde::{Deserialize, Serialize};

use crate::domain::FundamentalSnapshot;

/// What an unreported growth figure means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentField {
    /// Compare as 0%, so any positive threshold fails.
    #[default]
    TreatAsZero,
    /// Skip the sub-check for that figure.
    SkipCheck,
}

/// Minimum fundamentals a candidate must show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalThresholds {
    pub min_market_cap_b: f64,
    pub min_revenue_growth_pct: f64,
    pub min_earnings_growth_pct: f64,
    pub absent: AbsentField,
}

/// The first fundamental sub-check that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundamentalFailure {
    MarketCap,
    RevenueGrowth,
    EarningsGrowth,
    /// The snapshot could not be retrieved.
    Unavailable,
}

impl std::fmt::Display for FundamentalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MarketCap => "market cap below minimum",
            Self::RevenueGrowth => "revenue growth below minimum",
            Self::EarningsGrowth => "earnings growth below minimum",
            Self::Unavailable => "fundamentals unavailable",
        };
        f.write_str(s)
    }
}

/// Display values plus the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalCheck {
    pub market_cap_b: f64,
    /// Percent; `None` if the provider did not report it.
    pub revenue_growth_pct: Option<f64>,
    pub earnings_growth_pct: Option<f64>,
    pub failure: Option<FundamentalFailure>,
}

impl FundamentalCheck {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

fn growth_fails(pct: Option<f64>, min: f64, absent: AbsentField) -> bool {
    match (pct, absent) {
        (Some(v), _) => v < min,
        (None, AbsentField::TreatAsZero) => 0.0 < min,
        (None, AbsentField::SkipCheck) => false,
    }
}

fn as_pct(growth: Option<f64>) -> Option<f64> {
    growth.filter(|g| g.is_finite()).map(|g| g * 100.0)
}

/// Apply the thresholds to a snapshot. Checks run market cap, revenue, earnings.
///
/// A non-finite growth figure counts as unreported. A non-finite market cap
/// fails the market cap check.
pub fn evaluate_fundamentals(
    snapshot: &FundamentalSnapshot,
    t: &FundamentalThresholds,
) -> FundamentalCheck {
    let market_cap_b = snapshot.market_cap_billions();
    let revenue_growth_pct = as_pct(snapshot.revenue_growth);
    let earnings_growth_pct = as_pct(snapshot.earnings_growth);

    let failure = if !market_cap_b.is_finite() || market_cap_b < t.min_market_cap_b {
        Some(FundamentalFailure::MarketCap)
    } else if growth_fails(revenue_growth_pct, t.min_revenue_growth_pct, t.absent) {
        Some(FundamentalFailure::RevenueGrowth)
    } else if growth_fails(earnings_growth_pct, t.min_earnings_growth_pct, t.absent) {
        Some(FundamentalFailure::EarningsGrowth)
    } else {
        None
    };

    FundamentalCheck {
        market_cap_b,
        revenue_growth_pct,
        earnings_growth_pct,
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> FundamentalThresholds {
        FundamentalThresholds {
            min_market_cap_b: 2.0,
            min_revenue_growth_pct: 25.0,
            min_earnings_growth_pct: 20.0,
            absent: AbsentField::TreatAsZero,
        }
    }

    #[test]
    fn passes_when_all_above_minimums() {
        let snap = FundamentalSnapshot::new(5e9, Some(0.5), Some(0.25));
        let check = evaluate_fundamentals(&snap, &strict());
        assert!(check.passed());
        assert_eq!(check.market_cap_b, 5.0);
        assert_eq!(check.revenue_growth_pct, Some(50.0));
    }

    #[test]
    fn small_cap_fails_first() {
        let snap = FundamentalSnapshot::new(1e9, None, None);
        let check = evaluate_fundamentals(&snap, &strict());
        assert_eq!(check.failure, Some(FundamentalFailure::MarketCap));
    }

    #[test]
    fn missing_revenue_growth_is_zero_and_fails() {
        let snap = FundamentalSnapshot::new(5e9, None, Some(0.5));
        let check = evaluate_fundamentals(&snap, &strict());
        assert_eq!(check.failure, Some(FundamentalFailure::RevenueGrowth));
        assert_eq!(check.revenue_growth_pct, None);
    }

    #[test]
    fn missing_growth_can_skip_the_check() {
        let mut t = strict();
        t.absent = AbsentField::SkipCheck;
        let snap = FundamentalSnapshot::new(5e9, None, None);
        assert!(evaluate_fundamentals(&snap, &t).passed());
    }

    #[test]
    fn non_finite_market_cap_fails() {
        for cap in [f64::NAN, f64::INFINITY] {
            let snap = FundamentalSnapshot::new(cap, Some(0.5), Some(0.5));
            let check = evaluate_fundamentals(&snap, &strict());
            assert_eq!(check.failure, Some(FundamentalFailure::MarketCap));
        }
    }

    #[test]
    fn nan_growth_counts_as_unreported() {
        let snap = FundamentalSnapshot::new(5e9, Some(f64::NAN), Some(0.5));
        let check = evaluate_fundamentals(&snap, &strict());
        assert_eq!(check.revenue_growth_pct, None);
        assert_eq!(check.failure, Some(FundamentalFailure::RevenueGrowth));

        let mut t = strict();
        t.absent = AbsentField::SkipCheck;
        assert!(evaluate_fundamentals(&snap, &t).passed());
    }

    #[test]
    fn earnings_growth_checked_last() {
        let snap = FundamentalSnapshot::new(5e9, Some(0.30), Some(0.10));
        let check = evaluate_fundamentals(&snap, &strict());
        assert_eq!(check.failure, Some(FundamentalFailure::EarningsGrowth));
    }

    #[test]
    fn looser_thresholds_admit_smaller_names() {
        let loose = FundamentalThresholds {
            min_market_cap_b: 0.3,
            min_revenue_growth_pct: 15.0,
            min_earnings_growth_pct: 15.0,
            absent: AbsentField::TreatAsZero,
        };
        let snap = FundamentalSnapshot::new(0.5e9, Some(0.16), Some(0.2));
        assert!(evaluate_fundamentals(&snap, &loose).passed());
        assert!(!evaluate_fundamentals(&snap, &strict()).passed());
    }
}
