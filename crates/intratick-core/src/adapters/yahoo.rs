//! Yahoo Finance chart API adapter.
//!
//! Fetches OHLCV history through the unauthenticated v8 chart endpoint.
//! Rows with missing OHLC entries are skipped at parse time; whether the
//! surviving series is usable is decided by the fetcher's validation pass.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider::{BarProvider, ProviderError};
use crate::{Bar, BarSeries, Interval, Symbol};

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance bar provider.
#[derive(Clone)]
pub struct YahooProvider {
    http: Arc<dyn HttpClient>,
    request_timeout: Duration,
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self {
            http: Arc::new(ReqwestHttpClient::new()),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl YahooProvider {
    /// Build a provider over a custom transport (scripted in tests).
    pub fn with_http_client(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn chart_url(symbol: &Symbol, interval: Interval) -> String {
        format!(
            "{}/{}?range={}&interval={}&includePrePost=false",
            CHART_BASE_URL,
            urlencoding::encode(symbol.as_str()),
            interval.lookback_range(),
            interval.as_str(),
        )
    }

    fn parse_chart(
        symbol: &Symbol,
        interval: Interval,
        body: &str,
    ) -> Result<BarSeries, ProviderError> {
        let trimmed = body.trim_start();
        if trimmed.starts_with("<html") || trimmed.starts_with("<!DOCTYPE") {
            return Err(ProviderError::malformed("yahoo returned an HTML page"));
        }

        let response: ChartResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::malformed(format!("failed to parse yahoo chart: {e}")))?;

        if let Some(error) = response.chart.error {
            return Err(ProviderError::unavailable(format!(
                "yahoo chart API error: {} ({})",
                error.description, error.code
            )));
        }

        let result = response
            .chart
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
            .ok_or_else(|| ProviderError::malformed("no chart result in response"))?;

        let timestamps = result
            .timestamp
            .ok_or_else(|| ProviderError::malformed("no timestamp data in chart result"))?;
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed("no quote block in chart result"))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        let mut skipped = 0usize;
        for (i, &unix) in timestamps.iter().enumerate() {
            let ts: DateTime<Utc> = match DateTime::from_timestamp(unix, 0) {
                Some(ts) => ts,
                None => {
                    skipped += 1;
                    continue;
                }
            };

            let row = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            );
            let (Some(open), Some(high), Some(low), Some(close)) = row else {
                skipped += 1;
                continue;
            };
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);

            match Bar::new(ts, open, high, low, close, volume) {
                Ok(bar) => bars.push(bar),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(symbol = %symbol, %interval, skipped, "skipped incomplete chart rows");
        }

        BarSeries::new(symbol.clone(), interval, bars)
            .map_err(|e| ProviderError::malformed(format!("chart rows out of order: {e}")))
    }
}

impl BarProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn fetch_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        interval: Interval,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            let url = Self::chart_url(symbol, interval);
            debug!(symbol = %symbol, %interval, "requesting yahoo chart");

            let request = HttpRequest::get(&url)
                .with_header("referer", "https://finance.yahoo.com/")
                .with_timeout(self.request_timeout);

            let response = self.http.execute(request).await.map_err(|e| {
                warn!(symbol = %symbol, %interval, error = %e, "yahoo transport error");
                if e.retryable() {
                    ProviderError::unavailable(format!("yahoo transport error: {}", e.message()))
                } else {
                    ProviderError::invalid_request(format!(
                        "yahoo transport error: {}",
                        e.message()
                    ))
                }
            })?;

            if response.status == 429 {
                return Err(ProviderError::rate_limited("yahoo throttled the request"));
            }
            if !response.is_success() {
                return Err(ProviderError::unavailable(format!(
                    "yahoo returned status {}",
                    response.status
                )));
            }

            Self::parse_chart(symbol, interval, &response.body)
        })
    }
}

// Chart response shape (only the fields we read).

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartPayload,
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
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
