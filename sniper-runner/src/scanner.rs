//! Sequential scan loop.
//!
//! Symbols are evaluated strictly one at a time in list order. Before each
//! symbol's first provider call the loop checks the cancellation flag; once set,
//! the loop stops and the report carries whatever was evaluated so far.
//! Per-symbol failures never abort the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use sniper_core::data::MarketDataProvider;
use sniper_core::screen::{fetch_benchmark, BenchmarkReturn, SymbolOutcome};

use crate::config::{ConfigError, ScanConfig};
use crate::report::{ScanReport, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Progress hooks for a running scan. All methods default to no-ops.
pub trait ScanProgress {
    /// Called before the symbol's first provider call. `index` is 0-based.
    fn on_symbol_start(&self, _index: usize, _total: usize, _symbol: &str) {}

    fn on_symbol_done(&self, _index: usize, _total: usize, _outcome: &SymbolOutcome) {}

    fn on_scan_complete(&self, _report: &ScanReport) {}
}

/// Progress sink that ignores everything.
pub struct NoProgress;

impl ScanProgress for NoProgress {}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Benchmark return for the run, or `None` (with a warning) if it can't be had.
fn load_benchmark(
    config: &ScanConfig,
    provider: &dyn MarketDataProvider,
    lookback: sniper_core::data::Lookback,
) -> Option<BenchmarkReturn> {
    let symbol = &config.benchmark.symbol;
    match fetch_benchmark(provider, symbol, lookback, config.benchmark.return_window) {
        Ok(b) => {
            info!(
                benchmark = %b.symbol,
                window = b.window,
                return_pct = b.return_pct,
                "benchmark return computed"
            );
            Some(b)
        }
        Err(e) => {
            warn!(benchmark = %symbol, error = %e, "benchmark unavailable, relative strength disabled");
            None
        }
    }
}

/// Run one scan over `symbols`.
///
/// # Arguments
/// - `symbols`: evaluation order; duplicates are evaluated each time.
/// - `config`: validated before any provider call.
/// - `provider`: market data source.
/// - `progress`: per-symbol hooks.
/// - `cancel`: optional flag to stop the loop cooperatively.
pub fn run_scan(
    symbols: &[String],
    config: &ScanConfig,
    provider: &dyn MarketDataProvider,
    progress: &dyn ScanProgress,
    cancel: Option<&AtomicBool>,
) -> Result<ScanReport, ScanError> {
    config.validate()?;
    let screener = config.screener()?;
    let fingerprint = config.fingerprint(symbols, &provider.identity())?;

    let started_at = chrono::Utc::now();
    let start = Instant::now();
    let total = symbols.len();
    let throttle = Duration::from_millis(config.throttle_ms);

    info!(
        symbols = total,
        mode = ?config.mode,
        provider = provider.name(),
        "starting scan"
    );

    let benchmark = if config.mode.uses_annotations() && total > 0 && !is_cancelled(cancel) {
        load_benchmark(config, provider, screener.lookback())
    } else {
        None
    };

    let mut outcomes = Vec::with_capacity(total);
    let mut cancelled = false;

    for (index, symbol) in symbols.iter().enumerate() {
        if index > 0 && !throttle.is_zero() {
            std::thread::sleep(throttle);
        }
        if is_cancelled(cancel) {
            info!(evaluated = index, total, "scan cancelled");
            cancelled = true;
            break;
        }

        progress.on_symbol_start(index, total, symbol);
        let outcome = screener.evaluate(symbol, provider, benchmark.as_ref());
        match &outcome {
            SymbolOutcome::Qualified(r) => {
                debug!(symbol = %symbol, status = %r.status, volume_relative = r.volume_relative, "qualified");
            }
            SymbolOutcome::Skipped { reason, .. } => {
                debug!(symbol = %symbol, reason = %reason, "skipped");
            }
        }
        progress.on_symbol_done(index, total, &outcome);
        outcomes.push(outcome);
    }

    let report = ScanReport {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        mode: config.mode,
        provider: provider.name().to_string(),
        symbols_total: total,
        outcomes,
        cancelled,
        benchmark,
        started_at,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    info!(
        evaluated = report.evaluated(),
        cancelled,
        elapsed_secs = report.duration_secs,
        "{}",
        report.summary()
    );
    progress.on_scan_complete(&report);
    Ok(report)
}
