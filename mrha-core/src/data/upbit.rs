//! Upbit quotation API provider.
//!
//! Candles come back newest first, at most 200 per request. Longer histories
//! are paged backwards by passing the oldest candle's UTC timestamp as the
//! `to` cursor of the next request. Retries use exponential backoff, and the
//! shared circuit breaker stops all requests after a block or repeated failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, DataSource, FetchResult, Interval};
use crate::domain::PriceBar;

const BASE_URL: &str = "https://api.upbit.com/v1/candles";

/// Maximum candles per request accepted by the API.
pub const PAGE_SIZE: usize = 200;

#[derive(Debug, Deserialize)]
struct Candle {
    candle_date_time_utc: String,
    candle_date_time_kst: String,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    candle_acc_trade_volume: f64,
}

pub struct UpbitProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
    page_delay: Duration,
}

impl UpbitProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            page_delay: Duration::from_millis(100),
        })
    }

    fn endpoint(interval: Interval) -> String {
        let unit = match interval {
            Interval::Day => "days",
            Interval::Week => "weeks",
            Interval::Month => "months",
        };
        format!("{BASE_URL}/{unit}")
    }

    /// One page of candles ending before `to`, newest first.
    fn fetch_page(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
        to: Option<&str>,
    ) -> Result<Vec<Candle>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::endpoint(interval);
        let count = count.to_string();
        let mut query: Vec<(&str, &str)> = vec![("market", symbol), ("count", &count)];
        if let Some(cursor) = to {
            query.push(("to", cursor));
        }

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying upbit request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).query(&query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
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
                warn!(symbol, "upbit rate limit hit");
                last_error = Some(DataError::RateLimited { retry_after_secs: 1 });
                continue;
            }
            if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let candles: Vec<Candle> = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse candles for {symbol}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Ok(candles);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Candle date from the KST timestamp ("2024-01-02T09:00:00").
fn candle_date(candle: &Candle) -> Result<NaiveDate, DataError> {
    let day = candle.candle_date_time_kst.get(..10).unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
        DataError::ResponseFormatChanged(format!(
            "bad candle timestamp '{}': {e}",
            candle.candle_date_time_kst
        ))
    })
}

/// Convert newest-first candles to oldest-first bars.
fn candles_to_bars(candles: &[Candle]) -> Result<Vec<PriceBar>, DataError> {
    candles
        .iter()
        .rev()
        .map(|c| {
            Ok(PriceBar {
                date: candle_date(c)?,
                open: c.opening_price,
                high: c.high_price,
                low: c.low_price,
                close: c.trade_price,
                volume: c.candle_acc_trade_volume,
            })
        })
        .collect()
}

impl DataProvider for UpbitProvider {
    fn name(&self) -> &str {
        "upbit"
    }

    fn fetch(&self, symbol: &str, interval: Interval, count: usize) -> Result<FetchResult, DataError> {
        let mut pages: Vec<Vec<PriceBar>> = Vec::new();
        let mut remaining = count;
        let mut cursor: Option<String> = None;

        while remaining > 0 {
            if cursor.is_some() {
                std::thread::sleep(self.page_delay);
            }
            let want = remaining.min(PAGE_SIZE);
            let candles = self.fetch_page(symbol, interval, want, cursor.as_deref())?;
            let Some(oldest) = candles.last() else {
                break;
            };
            cursor = Some(oldest.candle_date_time_utc.clone());
            remaining = remaining.saturating_sub(candles.len());
            let short_page = candles.len() < want;
            pages.push(candles_to_bars(&candles)?);
            if short_page {
                break;
            }
        }

        // Pages were fetched newest first; each page is already oldest first.
        let bars: Vec<PriceBar> = pages.into_iter().rev().flatten().collect();
        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        debug!(symbol, %interval, bars = bars.len(), "fetched from upbit");

        Ok(FetchResult {
            symbol: symbol.to_string(),
            interval,
            bars,
            source: DataSource::Upbit,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
