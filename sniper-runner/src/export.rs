//! Export: CSV results table and JSON report round-trip.
//!
//! - **CSV**: one row per qualifying symbol, in the order given
//! - **JSON**: the whole `ScanReport` with schema versioning
//!
//! Persisted reports carry a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::Path;

use anyhow::{bail, Context, Result};

use sniper_core::screen::ScreeningResult;

use crate::report::{ScanReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `ScanReport` to pretty JSON.
pub fn export_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScanReport to JSON")
}

/// Deserialize a `ScanReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ScanReport> {
    let report: ScanReport =
        serde_json::from_str(json).context("failed to deserialize ScanReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn write_json(report: &ScanReport, path: &Path) -> Result<()> {
    let json = export_json(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── CSV export ─────────────────────────────────────────────────────

pub const CSV_COLUMNS: [&str; 15] = [
    "symbol",
    "price",
    "volume_relative",
    "dist_sma200_pct",
    "high_20d",
    "low_20d",
    "market_cap_b",
    "revenue_growth_pct",
    "earnings_growth_pct",
    "relative_strength",
    "stop_loss",
    "position_size",
    "earnings_risk",
    "status",
    "link",
];

fn opt_f64(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_default()
}

/// Export results as CSV. Absent optional values are empty cells.
pub fn export_csv(results: &[&ScreeningResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_COLUMNS)?;

    for r in results {
        let f = r.fundamentals.as_ref();
        wtr.write_record([
            r.symbol.clone(),
            format!("{:.2}", r.price),
            format!("{:.2}", r.volume_relative),
            format!("{:.1}", r.distance_from_200sma * 100.0),
            format!("{:.2}", r.high_20d),
            format!("{:.2}", r.low_20d),
            opt_f64(f.map(|f| f.market_cap_b)),
            opt_f64(f.and_then(|f| f.revenue_growth_pct)),
            opt_f64(f.and_then(|f| f.earnings_growth_pct)),
            opt_f64(r.relative_strength),
            opt_f64(r.stop_loss),
            r.position_size.map(|n| n.to_string()).unwrap_or_default(),
            r.earnings_risk.label(),
            r.status.to_string(),
            r.reference_link.clone(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_csv(results: &[&ScreeningResult], path: &Path) -> Result<()> {
    let csv = export_csv(results)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}
