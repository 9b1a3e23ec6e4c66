//! Serializable scan configuration.
//!
//! Every field has a default, so a partial TOML file (or none at all) is a
//! valid configuration. `validate()` is the single place where ranges are
//! checked; the scanner calls it before touching any provider.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sniper_core::screen::{
    AbsentField, FundamentalThresholds, PositionSizer, ScanMode, Screener, SizingError,
    TechnicalThresholds, DEFAULT_EARNINGS_WINDOW_DAYS, DEFAULT_LINK_TEMPLATE, DEFAULT_STOP_BUFFER,
    QUARTER_BARS,
};

use crate::universe::UniverseFilter;

/// Content hash of a configuration plus its symbol list.
pub type Fingerprint = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid risk settings: {0}")]
    Sizing(#[from] SizingError),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Universe pre-filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    pub min_price: f64,
    pub min_volume: u64,
    /// Keep only the first N symbols after filtering; absent means no cap.
    pub max_symbols: Option<usize>,
}

impl Default for UniverseSection {
    fn default() -> Self {
        Self {
            min_price: 10.0,
            min_volume: 150_000,
            max_symbols: Some(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalSection {
    /// K: minimum price as a fraction of the period high.
    pub proximity_to_high: f64,
    /// Maximum fractional distance above SMA200; absent disables the guard.
    pub extension_cap: Option<f64>,
    pub breakout_volume_ratio: f64,
}

impl Default for TechnicalSection {
    fn default() -> Self {
        Self {
            proximity_to_high: 0.75,
            extension_cap: None,
            breakout_volume_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalSection {
    pub min_market_cap_b: f64,
    pub min_revenue_growth_pct: f64,
    pub min_earnings_growth_pct: f64,
    /// How to treat a growth figure the provider does not report.
    pub absent_fields: AbsentField,
}

impl Default for FundamentalSection {
    fn default() -> Self {
        Self {
            min_market_cap_b: 2.0,
            min_revenue_growth_pct: 25.0,
            min_earnings_growth_pct: 20.0,
            absent_fields: AbsentField::TreatAsZero,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub account_capital: f64,
    /// Percent of capital risked per position (1.0 = 1%).
    pub risk_pct: f64,
    /// Stop distance below the prior 20-bar low, as a fraction.
    pub stop_buffer: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            account_capital: 10_000.0,
            risk_pct: 1.0,
            stop_buffer: DEFAULT_STOP_BUFFER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSection {
    pub symbol: String,
    /// Bars in the return comparison window.
    pub return_window: usize,
}

impl Default for BenchmarkSection {
    fn default() -> Self {
        Self {
            symbol: "SPY".to_string(),
            return_window: QUARTER_BARS,
        }
    }
}

/// Complete configuration for one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: ScanMode,
    /// Pause between symbols, milliseconds.
    pub throttle_ms: u64,
    pub earnings_window_days: i64,
    /// URL with a `{symbol}` placeholder.
    pub reference_url_template: String,
    pub universe: UniverseSection,
    pub technical: TechnicalSection,
    pub fundamental: FundamentalSection,
    pub risk: RiskSection,
    pub benchmark: BenchmarkSection,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Full,
            throttle_ms: 50,
            earnings_window_days: DEFAULT_EARNINGS_WINDOW_DAYS,
            reference_url_template: DEFAULT_LINK_TEMPLATE.to_string(),
            universe: UniverseSection::default(),
            technical: TechnicalSection::default(),
            fundamental: FundamentalSection::default(),
            risk: RiskSection::default(),
            benchmark: BenchmarkSection::default(),
        }
    }
}

impl ScanConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Check every range. Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let u = &self.universe;
        if !(u.min_price.is_finite() && u.min_price >= 0.0) {
            return Err(invalid("universe.min_price", format!("must be >= 0, got {}", u.min_price)));
        }
        if u.max_symbols == Some(0) {
            return Err(invalid("universe.max_symbols", "must be at least 1 when set"));
        }

        let t = &self.technical;
        if !(t.proximity_to_high > 0.0 && t.proximity_to_high <= 1.0) {
            return Err(invalid(
                "technical.proximity_to_high",
                format!("must be in (0, 1], got {}", t.proximity_to_high),
            ));
        }
        if let Some(cap) = t.extension_cap {
            if !(cap > 0.0 && cap.is_finite()) {
                return Err(invalid("technical.extension_cap", format!("must be > 0, got {cap}")));
            }
        }
        if !(t.breakout_volume_ratio > 0.0 && t.breakout_volume_ratio.is_finite()) {
            return Err(invalid(
                "technical.breakout_volume_ratio",
                format!("must be > 0, got {}", t.breakout_volume_ratio),
            ));
        }

        let f = &self.fundamental;
        for (field, value) in [
            ("fundamental.min_market_cap_b", f.min_market_cap_b),
            ("fundamental.min_revenue_growth_pct", f.min_revenue_growth_pct),
            ("fundamental.min_earnings_growth_pct", f.min_earnings_growth_pct),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, format!("must be finite, got {value}")));
            }
        }

        PositionSizer::new(self.risk.account_capital, self.risk.risk_pct)?;
        if !(self.risk.stop_buffer >= 0.0 && self.risk.stop_buffer < 1.0) {
            return Err(invalid(
                "risk.stop_buffer",
                format!("must be in [0, 1), got {}", self.risk.stop_buffer),
            ));
        }

        if self.benchmark.symbol.trim().is_empty() {
            return Err(invalid("benchmark.symbol", "must not be empty"));
        }
        if self.benchmark.return_window == 0 {
            return Err(invalid("benchmark.return_window", "must be at least 1"));
        }
        if self.earnings_window_days < 0 {
            return Err(invalid(
                "earnings_window_days",
                format!("must be >= 0, got {}", self.earnings_window_days),
            ));
        }
        if !self.reference_url_template.contains("{symbol}") {
            return Err(invalid(
                "reference_url_template",
                "must contain the {symbol} placeholder",
            ));
        }
        Ok(())
    }

    pub fn technical_thresholds(&self) -> TechnicalThresholds {
        TechnicalThresholds::new(
            self.technical.proximity_to_high,
            self.technical.extension_cap,
            self.technical.breakout_volume_ratio,
        )
    }

    pub fn fundamental_thresholds(&self) -> FundamentalThresholds {
        FundamentalThresholds {
            min_market_cap_b: self.fundamental.min_market_cap_b,
            min_revenue_growth_pct: self.fundamental.min_revenue_growth_pct,
            min_earnings_growth_pct: self.fundamental.min_earnings_growth_pct,
            absent: self.fundamental.absent_fields,
        }
    }

    pub fn universe_filter(&self) -> UniverseFilter {
        UniverseFilter {
            min_price: self.universe.min_price,
            min_volume: self.universe.min_volume,
            max_symbols: self.universe.max_symbols,
        }
    }

    /// Build the per-symbol screener. Sizing is attached in full mode only.
    pub fn screener(&self) -> Result<Screener, ConfigError> {
        let mut screener = Screener::new(
            self.mode,
            self.technical_thresholds(),
            self.fundamental_thresholds(),
        )
        .with_earnings_window(self.earnings_window_days)
        .with_link_template(self.reference_url_template.clone());
        if self.mode.uses_annotations() {
            let sizer = PositionSizer::new(self.risk.account_capital, self.risk.risk_pct)?;
            screener = screener.with_sizer(sizer, self.risk.stop_buffer);
        }
        Ok(screener)
    }

    /// Deterministic hash of this configuration, the symbol list and the
    /// data source identity.
    ///
    /// Two scans with identical settings over the same symbols and the same
    /// data share a fingerprint, which keys the result cache.
    pub fn fingerprint(
        &self,
        symbols: &[String],
        provider_identity: &str,
    ) -> Result<Fingerprint, ConfigError> {
        let json = serde_json::to_string(&(self, symbols, provider_identity))
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_config_is_valid() {
        ScanConfig::default().validate().unwrap();
    }

    #[test]
    fn default_universe_floor_is_price_10_volume_150k() {
        let filter = ScanConfig::default().universe_filter();
        assert_eq!(filter.min_price, 10.0);
        assert_eq!(filter.min_volume, 150_000);
        assert_eq!(filter.max_symbols, Some(50));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = ScanConfig::from_toml(
            r#"
            mode = "technical"

            [technical]
            proximity_to_high = 0.85
            extension_cap = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, ScanMode::Technical);
        assert_eq!(config.technical.proximity_to_high, 0.85);
        assert_eq!(config.technical.extension_cap, Some(0.6));
        assert_eq!(config.technical.breakout_volume_ratio, 1.5);
        assert_eq!(config.universe, UniverseSection::default());
        assert_eq!(config.benchmark.symbol, "SPY");
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = ScanConfig::default();
        config.fundamental.absent_fields = AbsentField::SkipCheck;
        config.universe.max_symbols = None;
        let text = config.to_toml().unwrap();
        let parsed = ScanConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = ScanConfig::from_toml("mode = \"turbo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut c = ScanConfig::default();
        c.technical.proximity_to_high = 1.2;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Invalid {
                field: "technical.proximity_to_high",
                ..
            })
        ));

        let mut c = ScanConfig::default();
        c.risk.risk_pct = 0.0;
        assert!(matches!(c.validate(), Err(ConfigError::Sizing(_))));

        let mut c = ScanConfig::default();
        c.reference_url_template = "https://example.com/quote".into();
        assert!(c.validate().is_err());

        let mut c = ScanConfig::default();
        c.universe.max_symbols = Some(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn fingerprint_deterministic_and_sensitive() {
        let config = ScanConfig::default();
        let syms = symbols(&["AAPL", "MSFT"]);
        let a = config.fingerprint(&syms, "yahoo_finance").unwrap();
        assert_eq!(a, config.fingerprint(&syms, "yahoo_finance").unwrap());
        assert_eq!(a.len(), 64);

        let mut stricter = config.clone();
        stricter.technical.proximity_to_high = 0.85;
        assert_ne!(a, stricter.fingerprint(&syms, "yahoo_finance").unwrap());
        assert_ne!(a, config.fingerprint(&symbols(&["AAPL"]), "yahoo_finance").unwrap());
    }

    #[test]
    fn fingerprint_separates_data_sources() {
        let config = ScanConfig::default();
        let syms = symbols(&["AAPL", "MSFT"]);
        let live = config.fingerprint(&syms, "yahoo_finance").unwrap();
        let synthetic = config.fingerprint(&syms, "synthetic:2024-06-28").unwrap();
        let offline = config.fingerprint(&syms, "csv_directory:/data/a").unwrap();
        let other_dir = config.fingerprint(&syms, "csv_directory:/data/b").unwrap();
        assert_ne!(live, synthetic);
        assert_ne!(live, offline);
        assert_ne!(offline, other_dir);
    }

    #[test]
    fn screener_reflects_mode() {
        let mut config = ScanConfig::default();
        config.mode = ScanMode::Technical;
        assert_eq!(config.screener().unwrap().mode(), ScanMode::Technical);
    }
}
