use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, ValidationError};

/// OHLCV bar record for a given interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(
        ts: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Whether open and close both fall inside the [low, high] range.
    ///
    /// Enforced per-series at validation time for intraday intervals only;
    /// daily/weekly provider data is allowed to violate this slightly.
    pub fn ohlc_consistent(&self) -> bool {
        self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
    }
}

/// Ordered series of bars for one (symbol, interval) pair.
///
/// Timestamps are strictly increasing; the series is immutable once built
/// and is replaced wholesale on re-fetch, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: Symbol, interval: Interval, bars: Vec<Bar>) -> Result<Self, ValidationError> {
        for pair in bars.windows(2) {
            if pair[1].ts <= pair[0].ts {
                return Err(ValidationError::NonMonotonicSeries);
            }
        }

        Ok(Self {
            symbol,
            interval,
            bars,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// First bar at or after `instant`.
    pub fn first_at_or_after(&self, instant: DateTime<Utc>) -> Option<&Bar> {
        let index = self.bars.partition_point(|bar| bar.ts < instant);
        self.bars.get(index)
    }

    /// Bars whose timestamps fall within `[start, end)`.
    pub fn bars_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[Bar] {
        let from = self.bars.partition_point(|bar| bar.ts < start);
        let to = self.bars.partition_point(|bar| bar.ts < end);
        &self.bars[from..to]
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn bar(secs: i64) -> Bar {
        Bar::new(ts(secs), 100.0, 101.0, 99.0, 100.5, 10).expect("valid bar")
    }

    #[test]
    fn rejects_high_below_low() {
        let err = Bar::new(ts(0), 100.0, 95.0, 105.0, 102.0, 10).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidBarRange));
    }

    #[test]
    fn rejects_non_finite_price() {
        let err = Bar::new(ts(0), f64::NAN, 101.0, 99.0, 100.0, 10).expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { .. }));
    }

    #[test]
    fn flags_open_outside_range_without_rejecting() {
        // Constructible (daily data tolerance) but flagged inconsistent.
        let bar = Bar::new(ts(0), 110.0, 105.0, 95.0, 100.0, 10).expect("constructible");
        assert!(!bar.ohlc_consistent());
    }

    #[test]
    fn rejects_out_of_order_series() {
        let symbol = Symbol::parse("NQ=F").expect("valid");
        let err = BarSeries::new(symbol, Interval::OneMinute, vec![bar(60), bar(60)])
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonMonotonicSeries));
    }

    #[test]
    fn slices_half_open_window() {
        let symbol = Symbol::parse("NQ=F").expect("valid");
        let series = BarSeries::new(
            symbol,
            Interval::OneMinute,
            vec![bar(0), bar(60), bar(120), bar(180)],
        )
        .expect("valid series");

        let window = series.bars_between(ts(60), ts(180));
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].ts, ts(60));
        assert_eq!(window[1].ts, ts(120));

        let at_or_after = series.first_at_or_after(ts(61)).expect("bar exists");
        assert_eq!(at_or_after.ts, ts(120));
    }
}
