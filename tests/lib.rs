// Shared fixtures for the intratick behavior tests.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use intratick_analytics::ExchangeClock;
use intratick_core::{Bar, BarSeries, FetcherConfig, Interval, RetryPolicy, Symbol};

pub use std::sync::Arc;

pub fn nq() -> Symbol {
    Symbol::parse("NQ=F").expect("valid symbol")
}

/// Exchange-local wall time as a UTC instant.
pub fn et_instant(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    let clock = ExchangeClock::default();
    let date = NaiveDate::from_ymd_opt(y, mo, d).expect("valid date");
    let time = NaiveTime::from_hms_opt(h, mi, s).expect("valid time");
    clock.to_utc(clock.localize(date, time))
}

/// Evenly spaced synthetic series with gently rising prices.
pub fn series_from(
    start: DateTime<Utc>,
    interval: Interval,
    step_minutes: i64,
    count: usize,
    base: f64,
) -> BarSeries {
    let bars = (0..count)
        .map(|i| {
            let price = base + i as f64 * 0.25;
            Bar::new(
                start + chrono::Duration::minutes(step_minutes * i as i64),
                price,
                price + 2.0,
                price - 2.0,
                price + 0.5,
                250,
            )
            .expect("valid bar")
        })
        .collect();
    BarSeries::new(nq(), interval, bars).expect("valid series")
}

/// Fetcher configuration with no real-world delays, for fast tests.
pub fn quick_config() -> FetcherConfig {
    FetcherConfig {
        ttl: Duration::from_secs(60),
        min_request_spacing: Duration::ZERO,
        retry: RetryPolicy::immediate(3),
    }
}
