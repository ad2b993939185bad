//! # Intratick Core
//!
//! Domain models and resilient OHLCV data acquisition for the intratick
//! intraday analytics engine.
//!
//! ## Overview
//!
//! This crate provides the foundation the analytics crate builds on:
//!
//! - **Canonical domain models** for bars and bar series, validated at
//!   construction
//! - **Provider contract** ([`BarProvider`]) with a real Yahoo Finance
//!   chart adapter and a deterministic fixture for tests
//! - **Acquisition orchestration** ([`BarFetcher`]): TTL cache,
//!   last-known-good fallback, per-symbol rate limiting, bounded retry
//!   with backoff, and single-flight deduplication of concurrent misses
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo Finance chart API) |
//! | [`cache`] | TTL cache + fallback store with disk snapshots |
//! | [`domain`] | Domain models (Symbol, Interval, Bar, BarSeries) |
//! | [`error`] | Core error types |
//! | [`fetcher`] | Fetch orchestration and series validation |
//! | [`http`] | HTTP transport abstraction |
//! | [`provider`] | Provider trait and test fixtures |
//! | [`retry`] | Retry scheduling and attempt classification |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use intratick_core::{BarFetcher, Interval, Symbol, YahooProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = BarFetcher::new(Arc::new(YahooProvider::default()));
//!     let symbol = Symbol::parse("NQ=F")?;
//!
//!     let outcome = fetcher.fetch(&symbol, Interval::OneHour).await?;
//!     println!(
//!         "{} bars, stale: {}",
//!         outcome.series.len(),
//!         outcome.is_stale()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! A fetch makes up to four attempts (initial + three retries with a
//! 2s/5s/10s backoff ladder), treating malformed responses and validation
//! rejections exactly like transport failures. When every attempt fails,
//! the last successful series for that key is served flagged as stale;
//! only when no fallback exists does the call fail, with a retryable
//! [`FetchError::DataUnavailable`]. Nothing in this crate is fatal to the
//! process.

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod provider;
pub mod retry;

// Re-export commonly used types at crate root for convenience

pub use adapters::YahooProvider;

pub use cache::{CacheMode, FallbackEntry, SeriesCache, SeriesKey};

pub use domain::{Bar, BarSeries, Interval, Symbol};

pub use error::{FetchError, ValidationError};

pub use fetcher::{
    validate_series, BarFetcher, FetchOutcome, FetcherConfig, Freshness, SeriesRejection,
};

pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient};

pub use provider::{BarProvider, FixtureProvider, ProviderError, ProviderErrorKind};

pub use retry::{AttemptOutcome, RetryPolicy};
