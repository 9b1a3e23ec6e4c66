//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API and fundamentals plus the
//! earnings calendar from the v10 quoteSummary API. Handles rate limiting,
//! retries with exponential backoff, response parsing, and the circuit breaker.
//!
//! quoteSummary requires a session cookie (set by `fc.yahoo.com`) and a crumb
//! from `/v1/test/getcrumb`. The crumb is fetched on first use and dropped
//! when Yahoo answers 401 so the next request fetches a fresh one.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The CSV directory provider is the offline fallback.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, Lookback, MarketDataProvider};
use crate::domain::{validate_history, Bar, FundamentalSnapshot};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";

// ─── Chart API payload ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    description: String,
}

/// Error body Yahoo sends with 4xx answers, e.g. 401 "Invalid Crumb".
#[derive(Debug, Deserialize)]
struct FinanceErrorResponse {
    finance: FinanceError,
}

#[derive(Debug, Deserialize)]
struct FinanceError {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

// ─── quoteSummary payload ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryModules {
    price: Option<PriceModule>,
    financial_data: Option<FinancialDataModule>,
    calendar_events: Option<CalendarEventsModule>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; absent values are `{}`.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    revenue_growth: Option<RawValue>,
    earnings_growth: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarEventsModule {
    earnings: Option<EarningsModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningsModule {
    #[serde(default)]
    earnings_date: Vec<RawValue>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw).filter(|v| v.is_finite())
}

fn retry_after_secs(resp: &reqwest::blocking::Response) -> u64 {
    resp.headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

/// Validate the body of a getcrumb answer. A consent page or JSON error
/// instead of a bare token means the cookie was not accepted.
fn parse_crumb(body: &str) -> Result<String, DataError> {
    let crumb = body.trim();
    let malformed = crumb.contains(|c: char| c.is_whitespace() || c == '<' || c == '{');
    if crumb.is_empty() || crumb.len() > 64 || malformed {
        return Err(DataError::Unauthorized("unexpected getcrumb response".into()));
    }
    Ok(crumb.to_string())
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    crumb: Mutex<Option<String>>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            crumb: Mutex::new(None),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str, lookback: Lookback) -> String {
        format!(
            "{BASE_URL}/v8/finance/chart/{symbol}?range={}&interval=1d&includeAdjustedClose=true",
            lookback.range_token()
        )
    }

    fn summary_url(symbol: &str, modules: &str) -> String {
        format!("{BASE_URL}/v10/finance/quoteSummary/{symbol}?modules={modules}")
    }

    /// Crumb for quoteSummary requests, fetched once and reused.
    ///
    /// The `fc.yahoo.com` visit only sets the session cookie; its status
    /// (usually 404) is ignored.
    fn crumb(&self) -> Result<String, DataError> {
        let mut cached = self.crumb.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        self.client
            .get(COOKIE_URL)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let resp = self
            .client
            .get(format!("{BASE_URL}/v1/test/getcrumb"))
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after_secs(&resp),
            });
        }
        if !status.is_success() {
            return Err(DataError::Unauthorized(format!(
                "getcrumb returned HTTP {status}"
            )));
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let crumb = parse_crumb(&body)?;
        debug!("obtained quoteSummary crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    fn invalidate_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fetch quoteSummary modules with the session crumb attached.
    fn summary(&self, symbol: &str, modules: &str) -> Result<SummaryModules, DataError> {
        let crumb = self.crumb()?;
        let url = Self::summary_url(symbol, modules);
        let result = self
            .get_json::<SummaryResponse>(&url, symbol, &[("crumb", crumb.as_str())])
            .and_then(|resp| Self::parse_summary(symbol, resp));
        if matches!(result, Err(DataError::Unauthorized(_))) {
            self.invalidate_crumb();
        }
        result
    }

    /// Map a 4xx answer to a terminal error. These are never retried and do
    /// not count against the circuit breaker.
    fn client_error(
        status: reqwest::StatusCode,
        api: Option<ApiError>,
        symbol: &str,
    ) -> DataError {
        match status {
            reqwest::StatusCode::NOT_FOUND => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            reqwest::StatusCode::UNAUTHORIZED => DataError::Unauthorized(match api {
                Some(e) if !e.description.is_empty() => e.description,
                Some(e) => e.code,
                None => format!("HTTP {status} for {symbol}"),
            }),
            _ => DataError::Other(match api {
                Some(e) => format!("HTTP {status} for {symbol}: {}: {}", e.code, e.description),
                None => format!("HTTP {status} for {symbol}"),
            }),
        }
    }

    /// Parse the chart API response into bars.
    ///
    /// Days with no prices at all (holidays), days with a partial quote and
    /// days whose quote fails the OHLC sanity check (Yahoo occasionally sends
    /// a zero open) are dropped. A repeated trailing date (Yahoo's live bar)
    /// replaces the earlier one.
    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars: Vec<Bar> = Vec::with_capacity(timestamps.len());
        let mut partial = 0usize;
        let mut insane = 0usize;

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
                if open.is_some() || high.is_some() || low.is_some() || close.is_some() {
                    partial += 1;
                }
                continue;
            };

            let bar = Bar {
                date,
                open,
                high,
                low,
                close,
                volume: volume.unwrap_or(0),
            };
            if !bar.is_sane() {
                insane += 1;
                continue;
            }

            match bars.last_mut() {
                Some(last) if last.date == date => *last = bar,
                _ => bars.push(bar),
            }
        }

        if partial > 0 || insane > 0 {
            debug!(symbol, partial, insane, "dropped unusable quotes from chart response");
        }

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        validate_history(&bars).map_err(|e| DataError::ValidationError(format!("{symbol}: {e}")))?;
        Ok(bars)
    }

    fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<SummaryModules, DataError> {
        let result = resp.quote_summary.result.ok_or_else(|| match resp.quote_summary.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) if err.code == "Unauthorized" => DataError::Unauthorized(err.description),
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty summary with no error".into()),
        })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::NoFundamentals {
                symbol: symbol.to_string(),
            })
    }

    fn snapshot_from_summary(
        symbol: &str,
        modules: &SummaryModules,
    ) -> Result<FundamentalSnapshot, DataError> {
        let market_cap = modules
            .price
            .as_ref()
            .and_then(|p| raw(&p.market_cap))
            .ok_or_else(|| DataError::NoFundamentals {
                symbol: symbol.to_string(),
            })?;

        let financial = modules.financial_data.as_ref();
        Ok(FundamentalSnapshot::new(
            market_cap,
            financial.and_then(|f| raw(&f.revenue_growth)),
            financial.and_then(|f| raw(&f.earnings_growth)),
        ))
    }

    fn earnings_from_summary(modules: &SummaryModules) -> Option<NaiveDate> {
        modules
            .calendar_events
            .as_ref()?
            .earnings
            .as_ref()?
            .earnings_date
            .iter()
            .filter_map(|v| v.raw)
            .filter_map(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
            .map(|dt| dt.naive_utc().date())
            .min()
    }

    /// Execute a GET with retry and circuit breaker logic, decoding JSON.
    ///
    /// Only 429, 5xx and connect/timeout failures are retried.
    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        symbol: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(url).query(query).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after_secs(&resp),
                        });
                        continue;
                    }

                    if status.is_client_error() {
                        let api = resp
                            .json::<FinanceErrorResponse>()
                            .ok()
                            .and_then(|body| body.finance.error);
                        return Err(Self::client_error(status, api, symbol));
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let body: T = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;
                    self.circuit_breaker.record_success();
                    return Ok(body);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn history(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, DataError> {
        let chart: ChartResponse =
            self.get_json(&Self::chart_url(symbol, lookback), symbol, &[])?;
        Self::parse_chart(symbol, chart)
    }

    fn fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        let modules = self.summary(symbol, "price,financialData")?;
        Self::snapshot_from_summary(symbol, &modules)
    }

    fn next_earnings_date(&self, symbol: &str) -> Result<Option<NaiveDate>, DataError> {
        let modules = self.summary(symbol, "calendarEvents")?;
        Ok(Self::earnings_from_summary(&modules))
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
