//! Swing Sniper CLI: scan, size, and config commands.
//!
//! Commands:
//! - `scan`: screen a universe file for Stage 2 uptrends with institutional volume
//! - `size`: standalone fixed-fractional position sizing calculator
//! - `init-config`: write the default TOML configuration

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sniper_core::data::{
    CircuitBreaker, CsvDirProvider, MarketDataProvider, SyntheticProvider, YahooProvider,
};
use sniper_core::screen::{suggested_stop, PositionSizer, ScanMode, ScreeningResult, SymbolOutcome};
use sniper_runner::{
    load_universe, run_scan, select_symbols, write_csv, write_json, ResultCache, ScanConfig,
    ScanProgress, ScanReport,
};

#[derive(Parser)]
#[command(
    name = "sniper",
    about = "Swing Sniper: Stage 2 uptrend and institutional volume screener"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a universe file and print ranked results.
    Scan(ScanArgs),
    /// Compute a position size from capital, risk and a stop.
    Size {
        /// Account capital in dollars.
        #[arg(long)]
        capital: f64,

        /// Percent of capital to risk (1.0 = 1%).
        #[arg(long, default_value_t = 1.0)]
        risk_pct: f64,

        /// Planned entry price.
        #[arg(long)]
        entry: f64,

        /// Explicit stop-loss price.
        #[arg(long, conflicts_with = "low_20d", required_unless_present = "low_20d")]
        stop: Option<f64>,

        /// Prior 20-day low; the stop is placed `--stop-buffer` below it.
        #[arg(long)]
        low_20d: Option<f64>,

        /// Fraction below the 20-day low for the derived stop.
        #[arg(long, default_value_t = 0.02)]
        stop_buffer: f64,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        /// Destination file.
        #[arg(default_value = "sniper.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Screener export with Symbol, Last Sale and Volume columns.
    #[arg(long)]
    universe: PathBuf,

    /// TOML config file. Defaults apply for anything missing.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stages to run: technical, fundamental or full.
    #[arg(long)]
    mode: Option<ScanMode>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    min_volume: Option<u64>,

    /// Scan only the first N symbols that pass the universe filter.
    #[arg(long, conflicts_with = "no_limit")]
    limit: Option<usize>,

    /// Scan every symbol that passes the universe filter.
    #[arg(long, default_value_t = false)]
    no_limit: bool,

    /// K: minimum price as a fraction of the period high.
    #[arg(long)]
    proximity: Option<f64>,

    /// Offline data directory (<SYMBOL>.csv plus optional fundamentals.csv).
    #[arg(long, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Use deterministic synthetic data.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Pause between symbols in milliseconds.
    #[arg(long)]
    throttle_ms: Option<u64>,

    /// Write ranked results as CSV.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Reuse reports cached in this directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Maximum age of a cached report, in minutes.
    #[arg(long, default_value_t = 60)]
    cache_ttl_mins: u64,

    /// Stop the scan after this many seconds and keep partial results.
    #[arg(long)]
    time_budget_secs: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan(args) => run_scan_cmd(args),
        Commands::Size {
            capital,
            risk_pct,
            entry,
            stop,
            low_20d,
            stop_buffer,
        } => run_size(capital, risk_pct, entry, stop, low_20d, stop_buffer),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},reqwest=warn,hyper=warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ─── scan ────────────────────────────────────────────────────────────

/// Prints one line per symbol to stderr.
struct StderrProgress;

impl ScanProgress for StderrProgress {
    fn on_symbol_done(&self, index: usize, total: usize, outcome: &SymbolOutcome) {
        let status = match outcome {
            SymbolOutcome::Qualified(r) => r.status.to_string(),
            SymbolOutcome::Skipped { reason, .. } => format!("skip ({reason})"),
        };
        eprintln!("[{}/{}] {:<8} {}", index + 1, total, outcome.symbol(), status);
    }
}

fn resolve_config(args: &ScanArgs) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(p) = args.min_price {
        config.universe.min_price = p;
    }
    if let Some(v) = args.min_volume {
        config.universe.min_volume = v;
    }
    if args.no_limit {
        config.universe.max_symbols = None;
    } else if let Some(n) = args.limit {
        config.universe.max_symbols = Some(n);
    }
    if let Some(k) = args.proximity {
        config.technical.proximity_to_high = k;
    }
    if let Some(ms) = args.throttle_ms {
        config.throttle_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

fn build_provider(args: &ScanArgs) -> Result<Box<dyn MarketDataProvider>> {
    if args.synthetic {
        let today = chrono::Local::now().date_naive();
        warn!("using SYNTHETIC data, results are not market data");
        return Ok(Box::new(SyntheticProvider::new(today)));
    }
    if let Some(dir) = &args.data_dir {
        return Ok(Box::new(CsvDirProvider::open(dir)?));
    }
    let breaker = Arc::new(CircuitBreaker::default_provider());
    Ok(Box::new(YahooProvider::new(breaker)?))
}

/// Raise `flag` once `secs` have elapsed.
fn spawn_time_budget(secs: u64, flag: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(secs));
        flag.store(true, Ordering::Relaxed);
    });
}

fn run_scan_cmd(args: ScanArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let rows = load_universe(&args.universe)?;
    let symbols = select_symbols(&rows, &config.universe_filter());
    info!(
        rows = rows.len(),
        selected = symbols.len(),
        "universe filtered"
    );

    let provider = build_provider(&args)?;
    let cache = args
        .cache_dir
        .as_ref()
        .map(ResultCache::new)
        .transpose()?;
    let key = config.fingerprint(&symbols, &provider.identity())?;
    let ttl = Duration::from_secs(args.cache_ttl_mins * 60);

    let cached = cache.as_ref().and_then(|c| c.get(&key, ttl));

    let report = match cached {
        Some(report) => {
            info!(fingerprint = %key, "using cached report");
            report
        }
        None => {
            let cancel = Arc::new(AtomicBool::new(false));
            if let Some(secs) = args.time_budget_secs {
                spawn_time_budget(secs, Arc::clone(&cancel));
            }
            let report = run_scan(
                &symbols,
                &config,
                provider.as_ref(),
                &StderrProgress,
                Some(cancel.as_ref()),
            )?;
            // Partial reports are not cached.
            if let Some(c) = &cache {
                if !report.cancelled {
                    if let Err(e) = c.put(&key, &report) {
                        warn!(error = %format!("{e:#}"), "failed to cache report");
                    }
                }
            }
            report
        }
    };

    print_report(&report);

    if let Some(path) = &args.output {
        write_csv(&report.ranked(), path)?;
        println!("Results written to: {}", path.display());
    }
    if let Some(path) = &args.json {
        write_json(&report, path)?;
        println!("Report written to: {}", path.display());
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}")).unwrap_or_else(|| "-".into())
}

fn print_row(r: &ScreeningResult) {
    println!(
        "{:<8} {:>10.2} {:>7.2} {:>8.1} {:>10.2} {:>10.2} {:>7} {:>10} {:>7} {:<16} {}",
        r.symbol,
        r.price,
        r.volume_relative,
        r.distance_from_200sma * 100.0,
        r.high_20d,
        r.low_20d,
        fmt_opt(r.relative_strength, 1),
        fmt_opt(r.stop_loss, 2),
        r.position_size.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
        r.earnings_risk.label(),
        r.status,
    );
}

fn print_report(report: &ScanReport) {
    println!();
    println!("=== Scan Result ({:?} mode, {}) ===", report.mode, report.provider);
    if let Some(b) = &report.benchmark {
        println!(
            "Benchmark:      {} {:+.2}% over {} bars",
            b.symbol, b.return_pct, b.window
        );
    }
    println!(
        "Evaluated:      {} of {} symbols in {:.1}s",
        report.evaluated(),
        report.symbols_total,
        report.duration_secs
    );
    if report.cancelled {
        println!("WARNING: scan stopped early, results are partial");
    }

    let ranked = report.ranked();
    if !ranked.is_empty() {
        println!();
        println!(
            "{:<8} {:>10} {:>7} {:>8} {:>10} {:>10} {:>7} {:>10} {:>7} {:<16} {}",
            "Symbol", "Price", "RelVol", "Dist200%", "High20", "Low20", "RS", "Stop", "Shares",
            "Earnings", "Status"
        );
        for r in &ranked {
            print_row(r);
        }
    }

    let skips = report.skip_counts();
    if !skips.is_empty() {
        println!();
        let parts: Vec<String> = skips.iter().map(|(k, n)| format!("{k}={n}")).collect();
        println!("Skipped:        {}", parts.join(", "));
    }
    println!();
    println!("{}", report.summary());
}

// ─── size ────────────────────────────────────────────────────────────

fn run_size(
    capital: f64,
    risk_pct: f64,
    entry: f64,
    stop: Option<f64>,
    low_20d: Option<f64>,
    stop_buffer: f64,
) -> Result<()> {
    let sizer = PositionSizer::new(capital, risk_pct)?;
    let stop = match (stop, low_20d) {
        (Some(s), _) => s,
        (None, Some(low)) => suggested_stop(low, stop_buffer),
        (None, None) => bail!("one of --stop or --low-20d is required"),
    };
    let shares = sizer.shares_to_buy(entry, stop);

    println!("Risk budget:    ${:.2}", sizer.risk_budget());
    println!("Entry:          {entry:.2}");
    println!("Stop:           {stop:.2}");
    println!("Risk/share:     {:.2}", entry - stop);
    println!("Shares:         {shares}");
    println!("Position value: ${:.2}", shares as f64 * entry);
    if shares == 0 {
        println!("WARNING: stop is at or above entry, no position");
    }
    Ok(())
}

// ─── init-config ─────────────────────────────────────────────────────

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let toml = ScanConfig::default().to_toml()?;
    std::fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Default config written to: {}", path.display());
    Ok(())
}
