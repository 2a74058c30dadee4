//! UN Comtrade data provider.
//!
//! Fetches monthly HS totals from the legacy `api/get` endpoint, one request per
//! year. Handles pacing between requests, retries with exponential backoff, and
//! the circuit breaker.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::month_end;
use super::provider::{DataError, DataSource, FetchResult, TradeProvider};
use crate::domain::{Flow, Partner, Reporter, TradeRecord};

pub const DEFAULT_BASE_URL: &str = "https://comtrade.un.org/api/get";

/// Comtrade reports raw USD; records are kept in millions.
const USD_PER_UNIT: f64 = 1_000_000.0;

#[derive(Debug, Deserialize)]
struct ComtradeResponse {
    #[serde(default)]
    dataset: Option<Vec<ComtradeRow>>,
}

#[derive(Debug, Deserialize)]
struct ComtradeRow {
    /// `YYYYMM`
    period: serde_json::Value,
    /// 1 = import, 2 = export, 3 = re-export, 4 = re-import
    #[serde(rename = "rgCode")]
    rg_code: u8,
    #[serde(rename = "TradeValue")]
    trade_value: Option<f64>,
}

pub struct ComtradeProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    reporter: Reporter,
    max_retries: u32,
    base_delay: Duration,
    request_interval: Duration,
}

impl ComtradeProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("tariffscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: DEFAULT_BASE_URL.to_string(),
            reporter: Reporter::Colombia,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            request_interval: Duration::from_secs(1),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Pause between yearly requests; the public endpoint throttles aggressively.
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    fn year_url(&self, partner: Partner, year: i32) -> String {
        format!(
            "{}?r={}&p={}&ps={year}&freq=M&px=HS&rg=all&fmt=json",
            self.base_url,
            self.reporter.comtrade_code(),
            partner.comtrade_code(),
        )
    }

    /// Sum rows per (month, flow) and convert them to month-end records.
    fn parse_response(partner: Partner, resp: ComtradeResponse) -> Result<Vec<TradeRecord>, DataError> {
        let rows = match resp.dataset {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };

        let mut totals: BTreeMap<(NaiveDate, Flow), f64> = BTreeMap::new();
        for row in rows {
            let flow = match row.rg_code {
                1 => Flow::Import,
                2 => Flow::Export,
                _ => continue,
            };
            let Some(value) = row.trade_value else {
                continue;
            };
            let date = parse_period(&row.period)?;
            *totals.entry((date, flow)).or_insert(0.0) += value / USD_PER_UNIT;
        }

        totals
            .into_iter()
            .map(|((date, flow), value)| {
                TradeRecord::new(date, partner, flow, value).map_err(DataError::from)
            })
            .collect()
    }

    fn fetch_year(&self, partner: Partner, year: i32) -> Result<Vec<TradeRecord>, DataError> {
        let url = self.year_url(partner, year);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }
            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            debug!(%url, attempt, "comtrade request");
            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited { retry_after_secs });
                continue;
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!(
                    "HTTP {status} for {partner} {year}"
                )));
                continue;
            }

            let body: ComtradeResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("{partner} {year}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Self::parse_response(partner, body);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl TradeProvider for ComtradeProvider {
    fn name(&self) -> &str {
        "un_comtrade"
    }

    /// Years that fail are logged and skipped; only a tripped breaker aborts.
    fn fetch(
        &self,
        partner: Partner,
        start_year: i32,
        end_year: i32,
    ) -> Result<FetchResult, DataError> {
        let mut records = Vec::new();
        for year in start_year..=end_year {
            if year > start_year {
                std::thread::sleep(self.request_interval);
            }
            match self.fetch_year(partner, year) {
                Ok(mut rows) => {
                    if rows.is_empty() {
                        warn!(%partner, year, "no data returned");
                    }
                    records.append(&mut rows);
                }
                Err(DataError::CircuitBreakerTripped) => {
                    return Err(DataError::CircuitBreakerTripped)
                }
                Err(e) => warn!(%partner, year, error = %e, "year fetch failed"),
            }
        }

        if records.is_empty() {
            return Err(DataError::NoData {
                partner,
                start_year,
                end_year,
            });
        }

        Ok(FetchResult {
            partner,
            records,
            source: DataSource::Comtrade,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

/// Comtrade encodes the period as `201601`, either as a number or a string.
fn parse_period(value: &serde_json::Value) -> Result<NaiveDate, DataError> {
    let raw = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => {
            return Err(DataError::ResponseFormatChanged(format!(
                "unexpected period value: {other}"
            )))
        }
    };
    let bad = || DataError::ResponseFormatChanged(format!("unexpected period: {raw}"));
    if raw.len() != 6 {
        return Err(bad());
    }
    let year: i32 = raw[..4].parse().map_err(|_| bad())?;
    let month: u32 = raw[4..].parse().map_err(|_| bad())?;
    month_end(year, month).ok_or_else(bad)
}
