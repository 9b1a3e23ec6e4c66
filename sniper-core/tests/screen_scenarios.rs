//! End-to-end screening scenarios against the offline providers.

use chrono::NaiveDate;
use sniper_core::data::{CsvDirProvider, Lookback, MarketDataProvider, SyntheticProvider};
use sniper_core::domain::Bar;
use sniper_core::screen::{
    fetch_benchmark, AbsentField, EarningsRisk, FundamentalFailure, FundamentalThresholds,
    PositionSizer, ScanMode, Screener, SkipReason, StatusLabel, TechnicalThresholds,
};

fn strict_fundamentals() -> FundamentalThresholds {
    FundamentalThresholds {
        min_market_cap_b: 2.0,
        min_revenue_growth_pct: 25.0,
        min_earnings_growth_pct: 20.0,
        absent: AbsentField::TreatAsZero,
    }
}

/// 200 strictly rising closes, with the last bar optionally a volume breakout.
fn rising_history(n: usize, breakout: bool) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut bars: Vec<Bar> = (0..n)
        .map(|i| {
            let close = 20.0 + 0.25 * i as f64;
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close - 0.1,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 500_000,
            }
        })
        .collect();
    if breakout {
        let last = bars.last_mut().unwrap();
        last.close += 2.0;
        last.high = last.close + 0.5;
        last.volume = 2_000_000;
    }
    bars
}

fn write_history(dir: &std::path::Path, symbol: &str, bars: &[Bar]) {
    let mut w = csv::Writer::from_path(dir.join(format!("{symbol}.csv"))).unwrap();
    for b in bars {
        w.serialize(b).unwrap();
    }
    w.flush().unwrap();
}

#[test]
fn exactly_200_rising_bars_from_csv_are_trend() {
    let dir = tempfile::tempdir().unwrap();
    write_history(dir.path(), "RISE", &rising_history(200, false));
    let provider = CsvDirProvider::open(dir.path()).unwrap();

    let screener = Screener::new(
        ScanMode::Technical,
        TechnicalThresholds::new(0.8, None, 1.5),
        strict_fundamentals(),
    );
    let outcome = screener.evaluate("RISE", &provider, None);
    let result = outcome.result().expect("should qualify");
    assert_eq!(result.status, StatusLabel::Trend);
    assert_eq!(result.price, 20.0 + 0.25 * 199.0);
}

#[test]
fn exactly_200_bars_with_volume_spike_are_breakout() {
    let dir = tempfile::tempdir().unwrap();
    write_history(dir.path(), "POP", &rising_history(200, true));
    let provider = CsvDirProvider::open(dir.path()).unwrap();

    let screener = Screener::new(
        ScanMode::Technical,
        TechnicalThresholds::new(0.8, None, 1.5),
        strict_fundamentals(),
    );
    let outcome = screener.evaluate("POP", &provider, None);
    let result = outcome.result().expect("should qualify");
    assert!(result.volume_relative > 1.5);
    assert_eq!(result.status, StatusLabel::Breakout);
}

#[test]
fn missing_revenue_growth_fails_positive_threshold() {
    let dir = tempfile::tempdir().unwrap();
    write_history(dir.path(), "RISE", &rising_history(252, false));
    std::fs::write(
        dir.path().join("fundamentals.csv"),
        "symbol,market_cap,revenue_growth,earnings_growth,next_earnings\nRISE,5000000000,,0.5,\n",
    )
    .unwrap();
    let provider = CsvDirProvider::open(dir.path()).unwrap();

    let screener = Screener::new(
        ScanMode::Fundamental,
        TechnicalThresholds::new(0.8, None, 1.5),
        strict_fundamentals(),
    );
    let outcome = screener.evaluate("RISE", &provider, None);
    assert_eq!(
        outcome.skip_reason(),
        Some(&SkipReason::FundamentalFail {
            failure: FundamentalFailure::RevenueGrowth
        })
    );
}

#[test]
fn full_mode_on_csv_data_fills_every_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let bars = rising_history(252, true);
    write_history(dir.path(), "POP", &bars);
    write_history(dir.path(), "SPY", &rising_history(252, false));
    std::fs::write(
        dir.path().join("fundamentals.csv"),
        "symbol,market_cap,revenue_growth,earnings_growth,next_earnings\n\
         POP,9000000000,0.40,0.35,2099-01-01\n",
    )
    .unwrap();
    let provider = CsvDirProvider::open(dir.path()).unwrap();

    let benchmark = fetch_benchmark(&provider, "SPY", Lookback::OneYear, 60).unwrap();
    let screener = Screener::new(
        ScanMode::Full,
        TechnicalThresholds::new(0.8, None, 1.5),
        strict_fundamentals(),
    )
    .with_sizer(PositionSizer::new(25_000.0, 1.0).unwrap(), 0.02)
    .with_link_template("https://example.test/{symbol}");

    let outcome = screener.evaluate("POP", &provider, Some(&benchmark));
    let result = outcome.result().expect("should qualify");
    assert_eq!(result.status, StatusLabel::BreakoutQuality);
    assert!(result.relative_strength.unwrap() > 0.0);
    assert!(result.position_size.unwrap() > 0);
    assert!(result.stop_loss.unwrap() < result.low_20d);
    assert!(matches!(result.earnings_risk, EarningsRisk::Clear { .. }));
    assert_eq!(result.reference_link, "https://example.test/POP");
}

#[test]
fn synthetic_provider_screens_without_errors() {
    let provider = SyntheticProvider::new(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap());
    assert!(provider.is_available());
    let screener = Screener::new(
        ScanMode::Full,
        TechnicalThresholds::new(0.75, None, 1.5),
        strict_fundamentals(),
    );
    for symbol in ["AAPL", "MSFT", "NVDA", "CRWD", "SMCI"] {
        let outcome = screener.evaluate(symbol, &provider, None);
        assert!(
            !matches!(outcome.skip_reason(), Some(SkipReason::FetchError { .. })),
            "{symbol}: {outcome:?}"
        );
    }
}
