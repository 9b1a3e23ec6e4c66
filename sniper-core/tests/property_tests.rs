//! Property tests for screening invariants.
//!
//! Uses proptest to verify:
//! 1. Short histories never qualify and never reach indicator math
//! 2. Relative volume never divides by zero
//! 3. Qualification is monotonic in the proximity threshold K
//! 4. Share counts are non-negative and zero for inverted stops

use chrono::NaiveDate;
use proptest::prelude::*;
use sniper_core::domain::Bar;
use sniper_core::screen::{
    evaluate_technical, volume_relative, PositionSizer, TechnicalOutcome, TechnicalThresholds,
};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Bars from a list of daily percentage moves, starting at 100.
fn bars_from_moves(moves: &[f64], volumes: &[u64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut close = 100.0_f64;
    moves
        .iter()
        .zip(volumes.iter().cycle())
        .enumerate()
        .map(|(i, (m, &volume))| {
            let open = close;
            close = (close * (1.0 + m)).max(1.0);
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume,
            }
        })
        .collect()
}

/// Moves with an upward drift so a useful share of histories qualify.
fn arb_moves(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.02..0.03_f64, len)
}

fn arb_volumes() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0..2_000_000_u64, 1..60)
}

// ── 1. Short histories ───────────────────────────────────────────────

proptest! {
    /// Any history under 200 bars is skipped as insufficient.
    #[test]
    fn short_history_never_qualifies(moves in arb_moves(0..200), volumes in arb_volumes()) {
        let bars = bars_from_moves(&moves, &volumes);
        let outcome = evaluate_technical(&bars, &TechnicalThresholds::new(0.75, None, 1.5));
        let is_insufficient = matches!(
            outcome,
            TechnicalOutcome::InsufficientHistory { required: 200, .. }
        );
        prop_assert!(is_insufficient);
    }
}

// ── 2. Zero-denominator guard ────────────────────────────────────────

proptest! {
    #[test]
    fn relative_volume_is_finite_and_non_negative(volume in 0..u64::MAX / 2, avg in 0.0..1e9_f64) {
        let rv = volume_relative(volume, avg);
        prop_assert!(rv.is_finite());
        prop_assert!(rv >= 0.0);
        if avg == 0.0 {
            prop_assert_eq!(rv, 0.0);
        }
    }

    /// All-zero volume histories report zero relative volume.
    #[test]
    fn zero_volume_history_reports_zero(moves in arb_moves(200..260)) {
        let bars = bars_from_moves(&moves, &[0]);
        let t = TechnicalThresholds::new(0.0, None, 1.5);
        if let Some(m) = sniper_core::screen::technical::compute_metrics(&bars, &t) {
            prop_assert_eq!(m.volume_relative, 0.0);
            prop_assert!(!m.breakout);
        }
    }
}

// ── 3. Monotonic K ───────────────────────────────────────────────────

proptest! {
    /// Raising K never turns a rejected symbol into a qualified one.
    #[test]
    fn qualification_monotonic_in_k(
        moves in arb_moves(200..260),
        volumes in arb_volumes(),
        k_low in 0.5..0.95_f64,
        delta in 0.0..0.3_f64,
    ) {
        let bars = bars_from_moves(&moves, &volumes);
        let k_high = k_low + delta;
        let loose = evaluate_technical(&bars, &TechnicalThresholds::new(k_low, None, 1.5));
        let strict = evaluate_technical(&bars, &TechnicalThresholds::new(k_high, None, 1.5));
        if strict.is_qualified() {
            prop_assert!(loose.is_qualified());
        }
    }
}

// ── 4. Sizing ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn shares_never_negative(
        capital in 1.0..1e7_f64,
        risk_pct in 0.01..100.0_f64,
        entry in 0.01..5_000.0_f64,
        stop in 0.0..5_000.0_f64,
    ) {
        let sizer = PositionSizer::new(capital, risk_pct).unwrap();
        let shares = sizer.shares_to_buy(entry, stop);
        if stop >= entry {
            prop_assert_eq!(shares, 0);
        } else {
            // Losing the full per-share risk on every share stays within budget.
            prop_assert!(shares as f64 * (entry - stop) <= sizer.risk_budget() + 1e-6);
        }
    }
}
