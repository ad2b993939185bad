//! Provider contract and test fixtures.
//!
//! A [`BarProvider`] supplies raw [`BarSeries`] for a (symbol, interval)
//! pair. The fetcher layered on top owns caching, rate limiting, retries,
//! and fallback; providers only translate one upstream call.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::{BarSeries, Interval, Symbol};

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Upstream unreachable, timed out, or returned a server error.
    Unavailable,
    /// Upstream throttled the request.
    RateLimited,
    /// The request itself is wrong (e.g., unknown symbol); retrying is futile.
    InvalidRequest,
    /// Upstream responded but the payload could not be interpreted.
    Malformed,
}

/// Structured provider error with retry classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Malformed,
            message: message.into(),
            retryable: true,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Upstream bar source contract.
///
/// Implementations must be `Send + Sync`; the fetcher shares one provider
/// across concurrent callers.
pub trait BarProvider: Send + Sync {
    /// Short provider name used in log lines.
    fn name(&self) -> &'static str;

    /// Fetch the full lookback window of bars for a symbol/interval.
    fn fetch_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        interval: Interval,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, ProviderError>> + Send + 'a>>;
}

/// Deterministic in-memory provider for tests.
///
/// Serves canned series per (symbol, interval), can be scripted to fail the
/// next N calls, and counts calls so tests can assert that a cache hit
/// performed no upstream work.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    series: Mutex<HashMap<(Symbol, Interval), BarSeries>>,
    fail_next: AtomicUsize,
    calls: AtomicUsize,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, series: BarSeries) {
        let key = (series.symbol.clone(), series.interval);
        self.series
            .lock()
            .expect("fixture map is not poisoned")
            .insert(key, series);
    }

    /// Make the next `count` calls fail with a retryable error.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Total upstream calls observed, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BarProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn fetch_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        interval: Interval,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let remaining = self.fail_next.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_next.store(remaining - 1, Ordering::SeqCst);
                return Err(ProviderError::unavailable("scripted fixture failure"));
            }

            let map = self.series.lock().expect("fixture map is not poisoned");
            map.get(&(symbol.clone(), interval))
                .cloned()
                .ok_or_else(|| {
                    ProviderError::unavailable(format!(
                        "no fixture series for {symbol} {interval}"
                    ))
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::Bar;

    fn sample_series(symbol: &Symbol) -> BarSeries {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid");
        let bar = Bar::new(ts, 100.0, 101.0, 99.0, 100.5, 10).expect("valid bar");
        BarSeries::new(symbol.clone(), Interval::OneDay, vec![bar]).expect("valid series")
    }

    #[tokio::test]
    async fn fixture_serves_inserted_series_and_counts_calls() {
        let provider = FixtureProvider::new();
        let symbol = Symbol::parse("NQ=F").expect("valid");
        provider.insert(sample_series(&symbol));

        let series = provider
            .fetch_bars(&symbol, Interval::OneDay)
            .await
            .expect("series available");
        assert_eq!(series.len(), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn fixture_fails_scripted_number_of_times() {
        let provider = FixtureProvider::new();
        let symbol = Symbol::parse("NQ=F").expect("valid");
        provider.insert(sample_series(&symbol));
        provider.fail_next(2);

        assert!(provider.fetch_bars(&symbol, Interval::OneDay).await.is_err());
        assert!(provider.fetch_bars(&symbol, Interval::OneDay).await.is_err());
        assert!(provider.fetch_bars(&symbol, Interval::OneDay).await.is_ok());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn missing_fixture_is_unavailable() {
        let provider = FixtureProvider::new();
        let symbol = Symbol::parse("ES=F").expect("valid");
        let err = provider
            .fetch_bars(&symbol, Interval::OneHour)
            .await
            .expect_err("no fixture");
        assert_eq!(err.kind(), ProviderErrorKind::Unavailable);
        assert!(err.retryable());
    }
}
