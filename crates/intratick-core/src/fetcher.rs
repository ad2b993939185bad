//! Resilient bar acquisition: cache, rate limiting, retry, fallback.
//!
//! [`BarFetcher`] is the single point of contact with the upstream provider.
//! Everything above it (calendar, levels, sessions, pivots, blocks) is a
//! pure function over the immutable series it returns.
//!
//! The miss path is single-flight per (symbol, interval): a concurrent
//! caller for the same key awaits the in-flight fetch and then reads the
//! freshly stored cache entry instead of issuing a redundant upstream call.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tracing::{debug, info, warn};

use crate::cache::{CacheMode, SeriesCache, SeriesKey};
use crate::provider::{BarProvider, ProviderError};
use crate::retry::{AttemptOutcome, RetryPolicy};
use crate::{BarSeries, FetchError, Interval, Symbol};

type SymbolLimiter = RateLimiter<Symbol, DefaultKeyedStateStore<Symbol>, DefaultClock>;

/// Tuning knobs for the acquisition layer.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// How long a cached series is served without re-fetching.
    ///
    /// Matches the upstream refresh cadence; entries older than twice this
    /// value are purged opportunistically.
    pub ttl: Duration,
    /// Minimum spacing between upstream requests per symbol.
    pub min_request_spacing: Duration,
    /// Delay ladder between failed attempts.
    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(95),
            min_request_spacing: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

/// How the returned series relates to the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fetched from upstream during this call.
    Fresh,
    /// Served from the TTL cache, at most one TTL old.
    Cached,
    /// Served from the fallback map after all attempts failed;
    /// may be arbitrarily stale.
    Stale,
}

/// A fetched series plus its provenance.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub series: Arc<BarSeries>,
    pub fetched_at: DateTime<Utc>,
    pub freshness: Freshness,
}

impl FetchOutcome {
    pub const fn is_stale(&self) -> bool {
        matches!(self.freshness, Freshness::Stale)
    }
}

/// Reason a fetched series was rejected by validation.
///
/// A rejection is handled exactly like a fetch failure: it re-enters the
/// retry loop and, if all attempts are exhausted, falls back to the last
/// known good series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesRejection {
    InsufficientBars { got: usize, need: usize },
    NonNumericBar { index: usize },
    InconsistentBar { index: usize },
}

impl Display for SeriesRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientBars { got, need } => {
                write!(f, "insufficient bars: {got} < {need} required")
            }
            Self::NonNumericBar { index } => {
                write!(f, "non-numeric OHLC values in bar {index}")
            }
            Self::InconsistentBar { index } => {
                write!(f, "open/close outside high/low range in bar {index}")
            }
        }
    }
}

/// Validate a fetched series against the interval's quality floor.
pub fn validate_series(series: &BarSeries) -> Result<(), SeriesRejection> {
    let need = series.interval.min_bars();
    if series.len() < need {
        return Err(SeriesRejection::InsufficientBars {
            got: series.len(),
            need,
        });
    }

    let strict = series.interval.strict_ohlc();
    for (index, bar) in series.bars.iter().enumerate() {
        let numeric = bar.open.is_finite()
            && bar.high.is_finite()
            && bar.low.is_finite()
            && bar.close.is_finite();
        if !numeric {
            return Err(SeriesRejection::NonNumericBar { index });
        }
        if strict && !bar.ohlc_consistent() {
            return Err(SeriesRejection::InconsistentBar { index });
        }
    }

    Ok(())
}

/// Owns the cache, fallback map, rate limiter, and retry policy.
///
/// One instance is shared across all callers; the provider is injected so
/// tests can run against a scripted fixture.
pub struct BarFetcher {
    provider: Arc<dyn BarProvider>,
    cache: SeriesCache,
    limiter: SymbolLimiter,
    retry: RetryPolicy,
    inflight: tokio::sync::Mutex<HashMap<SeriesKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl BarFetcher {
    pub fn new(provider: Arc<dyn BarProvider>) -> Self {
        Self::with_config(provider, FetcherConfig::default())
    }

    pub fn with_config(provider: Arc<dyn BarProvider>, config: FetcherConfig) -> Self {
        Self {
            provider,
            cache: SeriesCache::new(config.ttl),
            limiter: RateLimiter::keyed(spacing_quota(config.min_request_spacing)),
            retry: config.retry,
            inflight: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Fetch a series, serving from cache when possible.
    pub async fn fetch(
        &self,
        symbol: &Symbol,
        interval: Interval,
    ) -> Result<FetchOutcome, FetchError> {
        self.fetch_with_mode(symbol, interval, CacheMode::Use).await
    }

    /// Parse a raw ticker string and fetch.
    ///
    /// Malformed tickers are rejected before any I/O happens.
    pub async fn fetch_ticker(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<FetchOutcome, FetchError> {
        let symbol = Symbol::parse(ticker)?;
        self.fetch(&symbol, interval).await
    }

    pub async fn fetch_with_mode(
        &self,
        symbol: &Symbol,
        interval: Interval,
        mode: CacheMode,
    ) -> Result<FetchOutcome, FetchError> {
        let key: SeriesKey = (symbol.clone(), interval);

        if mode == CacheMode::Use {
            if let Some((series, fetched_at)) = self.cache.fresh(&key).await {
                debug!(%symbol, %interval, "cache hit");
                return Ok(FetchOutcome {
                    series,
                    fetched_at,
                    freshness: Freshness::Cached,
                });
            }
        }

        // Single-flight: serialize miss-path work per key, then re-check the
        // cache so late arrivals read the winner's result.
        let key_lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        let _guard = key_lock.lock().await;

        if mode == CacheMode::Use {
            if let Some((series, fetched_at)) = self.cache.fresh(&key).await {
                debug!(%symbol, %interval, "cache hit after awaiting in-flight fetch");
                return Ok(FetchOutcome {
                    series,
                    fetched_at,
                    freshness: Freshness::Cached,
                });
            }
        }

        self.fetch_upstream(symbol, interval, mode, &key).await
    }

    async fn fetch_upstream(
        &self,
        symbol: &Symbol,
        interval: Interval,
        mode: CacheMode,
        key: &SeriesKey,
    ) -> Result<FetchOutcome, FetchError> {
        let max_attempts = self.retry.max_attempts();
        let mut last_failure = String::from("no attempts were made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                if let Some(delay) = self.retry.delay_before_retry(attempt - 1) {
                    if !delay.is_zero() {
                        debug!(%symbol, %interval, ?delay, "backing off before retry");
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            // Per-symbol spacing applies to every attempt, retries included.
            self.limiter.until_key_ready(symbol).await;

            let attempt_result = match self.provider.fetch_bars(symbol, interval).await {
                Ok(series) => validate_series(&series).map(|()| series).map_err(|rejection| {
                    ProviderError::malformed(format!("series validation failed: {rejection}"))
                }),
                Err(error) => Err(error),
            };

            match AttemptOutcome::classify(attempt_result) {
                AttemptOutcome::Success(series) => {
                    let fetched_at = Utc::now();
                    let series = Arc::new(series);
                    if mode != CacheMode::Bypass {
                        self.cache
                            .store(key.clone(), Arc::clone(&series), fetched_at)
                            .await;
                    }
                    info!(
                        %symbol,
                        %interval,
                        bars = series.len(),
                        provider = self.provider.name(),
                        "fetched series"
                    );
                    return Ok(FetchOutcome {
                        series,
                        fetched_at,
                        freshness: Freshness::Fresh,
                    });
                }
                AttemptOutcome::Retryable(error) => {
                    warn!(
                        %symbol,
                        %interval,
                        attempt,
                        max_attempts,
                        error = %error,
                        "fetch attempt failed"
                    );
                    last_failure = error.message().to_owned();
                }
                AttemptOutcome::Fatal(error) => {
                    warn!(%symbol, %interval, error = %error, "fetch failed fatally");
                    last_failure = error.message().to_owned();
                    break;
                }
            }
        }

        if mode != CacheMode::Bypass {
            if let Some(entry) = self.cache.fallback(key).await {
                warn!(%symbol, %interval, "all attempts failed; serving stale fallback series");
                return Ok(FetchOutcome {
                    series: entry.series,
                    fetched_at: entry.fetched_at,
                    freshness: Freshness::Stale,
                });
            }
        }

        Err(FetchError::DataUnavailable {
            symbol: symbol.clone(),
            interval,
            reason: last_failure,
        })
    }

    /// Current price: close of the latest 1-minute bar.
    pub async fn current_price(&self, symbol: &Symbol) -> Result<f64, FetchError> {
        let outcome = self.fetch(symbol, Interval::OneMinute).await?;
        outcome
            .series
            .last()
            .map(|bar| bar.close)
            .ok_or_else(|| FetchError::DataUnavailable {
                symbol: symbol.clone(),
                interval: Interval::OneMinute,
                reason: String::from("series is empty"),
            })
    }

    /// Persist the fallback map for a cross-process warm start.
    pub async fn save_snapshot(&self, dir: &Path) -> std::io::Result<usize> {
        self.cache.save_snapshot(dir).await
    }

    /// Restore a previously saved snapshot into the fallback map.
    pub async fn load_snapshot(&self, dir: &Path) -> std::io::Result<usize> {
        self.cache.load_snapshot(dir).await
    }
}

fn spacing_quota(spacing: Duration) -> Quota {
    let period = spacing.max(Duration::from_millis(1));
    Quota::with_period(period)
        .expect("spacing period is non-zero")
        .allow_burst(NonZeroU32::MIN)
}
