//! Scan report: the result aggregator.
//!
//! Outcomes are kept in evaluation order, one per scanned symbol, duplicates
//! included. Display order is a separate, stable ranking.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sniper_core::screen::{BenchmarkReturn, ScanMode, ScreeningResult, SymbolOutcome};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: String,
    pub mode: ScanMode,
    pub provider: String,
    /// Symbols handed to the scan, including any never reached.
    pub symbols_total: usize,
    pub outcomes: Vec<SymbolOutcome>,
    /// True when the loop stopped early on the cancellation flag.
    pub cancelled: bool,
    pub benchmark: Option<BenchmarkReturn>,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ScanReport {
    /// Qualifying results in evaluation order.
    pub fn results(&self) -> Vec<&ScreeningResult> {
        self.outcomes.iter().filter_map(SymbolOutcome::result).collect()
    }

    /// Qualifying results by relative volume, highest first. Ties keep
    /// evaluation order.
    pub fn ranked(&self) -> Vec<&ScreeningResult> {
        let mut results = self.results();
        results.sort_by(|a, b| b.volume_relative.total_cmp(&a.volume_relative));
        results
    }

    pub fn evaluated(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of skipped symbols per skip kind.
    pub fn skip_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for reason in self.outcomes.iter().filter_map(SymbolOutcome::skip_reason) {
            *counts.entry(reason.key()).or_insert(0) += 1;
        }
        counts
    }

    /// User-facing one-liner.
    pub fn summary(&self) -> String {
        format!("{} results found", self.results().len())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sniper_core::screen::{EarningsRisk, Rejection, SkipReason, StatusLabel};

    pub(crate) fn result(symbol: &str, volume_relative: f64) -> ScreeningResult {
        ScreeningResult {
            symbol: symbol.to_string(),
            as_of: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            price: 100.0,
            volume_relative,
            distance_from_200sma: 0.2,
            high_20d: 98.0,
            low_20d: 90.0,
            breakout: false,
            fundamentals: None,
            stop_loss: None,
            relative_strength: None,
            position_size: None,
            earnings_risk: EarningsRisk::Unknown,
            status: StatusLabel::Trend,
            reference_link: format!("https://finance.yahoo.com/quote/{symbol}"),
        }
    }

    pub(crate) fn report(outcomes: Vec<SymbolOutcome>) -> ScanReport {
        ScanReport {
            schema_version: SCHEMA_VERSION,
            fingerprint: "abc".into(),
            mode: ScanMode::Technical,
            provider: "fake".into(),
            symbols_total: outcomes.len(),
            outcomes,
            cancelled: false,
            benchmark: None,
            started_at: Utc::now(),
            duration_secs: 0.5,
        }
    }

    fn skipped(symbol: &str, reason: SkipReason) -> SymbolOutcome {
        SymbolOutcome::Skipped {
            symbol: symbol.into(),
            reason,
        }
    }

    #[test]
    fn ranked_is_stable_descending() {
        let r = report(vec![
            SymbolOutcome::Qualified(result("A", 1.2)),
            SymbolOutcome::Qualified(result("B", 2.5)),
            SymbolOutcome::Qualified(result("C", 1.2)),
            SymbolOutcome::Qualified(result("D", 0.8)),
        ]);
        let order: Vec<&str> = r.ranked().iter().map(|x| x.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C", "D"]);
        // Evaluation order is untouched.
        let eval: Vec<&str> = r.results().iter().map(|x| x.symbol.as_str()).collect();
        assert_eq!(eval, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn skip_counts_and_summary() {
        let r = report(vec![
            SymbolOutcome::Qualified(result("A", 1.0)),
            skipped(
                "B",
                SkipReason::InsufficientHistory {
                    bars: 90,
                    required: 200,
                },
            ),
            skipped(
                "C",
                SkipReason::TechnicalReject {
                    reason: Rejection::TrendAlignment,
                },
            ),
            skipped(
                "D",
                SkipReason::TechnicalReject {
                    reason: Rejection::FarFromHigh,
                },
            ),
        ]);
        let counts = r.skip_counts();
        assert_eq!(counts.get("insufficient_history"), Some(&1));
        assert_eq!(counts.get("technical_reject"), Some(&2));
        assert_eq!(counts.get("fetch_error"), None);
        assert_eq!(r.evaluated(), 4);
        assert_eq!(r.summary(), "1 results found");
    }

    #[test]
    fn duplicate_symbols_each_produce_a_result() {
        let r = report(vec![
            SymbolOutcome::Qualified(result("A", 1.0)),
            SymbolOutcome::Qualified(result("A", 1.0)),
        ]);
        assert_eq!(r.results().len(), 2);
    }
}
