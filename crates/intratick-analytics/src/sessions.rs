//! Session range aggregation over the four fixed trading sessions.
//!
//! Sessions are exchange-local wall-clock windows. The Asian session spans
//! midnight: for a target date it starts on the prior calendar date at
//! 18:00 and ends on the target date at 02:00. Ranges are computed from a
//! 5-minute series filtered to `[start, end)`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use intratick_core::BarSeries;

use crate::tz::ExchangeClock;

/// The four fixed trading sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Asian,
    London,
    NyAm,
    NyPm,
}

impl SessionKind {
    pub const ALL: [SessionKind; 4] = [Self::Asian, Self::London, Self::NyAm, Self::NyPm];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asian => "asian",
            Self::London => "london",
            Self::NyAm => "ny_am",
            Self::NyPm => "ny_pm",
        }
    }

    /// Human-readable label with the local window.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asian => "Asian (18:00-02:00)",
            Self::London => "London (03:00-06:00)",
            Self::NyAm => "NY AM (08:30-12:00)",
            Self::NyPm => "NY PM (14:30-16:00)",
        }
    }

    /// Wall-clock window in exchange-local time.
    pub fn window(self) -> SessionWindow {
        let window = |sh, sm, eh, em, spans| SessionWindow {
            start: NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(eh, em, 0).unwrap_or(NaiveTime::MIN),
            spans_midnight: spans,
        };

        match self {
            Self::Asian => window(18, 0, 2, 0, true),
            Self::London => window(3, 0, 6, 0, false),
            Self::NyAm => window(8, 30, 12, 0, false),
            Self::NyPm => window(14, 30, 16, 0, false),
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurring wall-clock window of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub spans_midnight: bool,
}

/// High/low/range for one session on one calendar date.
///
/// All price fields are `None` with `bar_count == 0` when no bars fell in
/// the window; that is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SessionRange {
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub range: Option<f64>,
    pub bar_count: usize,
    pub is_active: bool,
}

/// Current price relative to a session's [low, high] band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePosition {
    Within,
    Above,
    Below,
}

impl SessionRange {
    /// Where `price` sits relative to this range, when resolved.
    pub fn position_of(&self, price: f64) -> Option<PricePosition> {
        let (high, low) = (self.high?, self.low?);
        Some(if price > high {
            PricePosition::Above
        } else if price < low {
            PricePosition::Below
        } else {
            PricePosition::Within
        })
    }
}

/// Computes session ranges from a fine-granularity series.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAggregator {
    clock: ExchangeClock,
}

impl SessionAggregator {
    pub fn new(clock: ExchangeClock) -> Self {
        Self { clock }
    }

    /// UTC bounds of a session for a target local date.
    ///
    /// Midnight-spanning sessions start on the prior calendar date.
    pub fn bounds(&self, kind: SessionKind, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let window = kind.window();
        let start_date = if window.spans_midnight && window.end < window.start {
            date - Duration::days(1)
        } else {
            date
        };

        let start = self.clock.to_utc(self.clock.localize(start_date, window.start));
        let end = self.clock.to_utc(self.clock.localize(date, window.end));
        (start, end)
    }

    /// Range for one session on one date.
    ///
    /// Pass `now` for current-day queries so `is_active` can be derived;
    /// previous-day queries pass `None` and are never active.
    pub fn range_for(
        &self,
        series: &BarSeries,
        kind: SessionKind,
        date: NaiveDate,
        now: Option<DateTime<Utc>>,
    ) -> SessionRange {
        let (start, end) = self.bounds(kind, date);
        let bars = series.bars_between(start, end);

        if bars.is_empty() {
            return SessionRange::default();
        }

        let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let is_active = now.map(|n| start <= n && n < end).unwrap_or(false);

        SessionRange {
            high: Some(high),
            low: Some(low),
            range: Some(high - low),
            bar_count: bars.len(),
            is_active,
        }
    }

    /// All four ranges for the current local day of `now`.
    pub fn current_day(
        &self,
        series: &BarSeries,
        now: DateTime<Utc>,
    ) -> Vec<(SessionKind, SessionRange)> {
        let today = self.clock.to_local(now).date_naive();
        SessionKind::ALL
            .into_iter()
            .map(|kind| (kind, self.range_for(series, kind, today, Some(now))))
            .collect()
    }

    /// All four ranges for the local day before `now`. Never active.
    pub fn previous_day(
        &self,
        series: &BarSeries,
        now: DateTime<Utc>,
    ) -> Vec<(SessionKind, SessionRange)> {
        let previous = self.clock.to_local(now).date_naive() - Duration::days(1);
        SessionKind::ALL
            .into_iter()
            .map(|kind| (kind, self.range_for(series, kind, previous, None)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use intratick_core::{Bar, Interval, Symbol};

    use super::*;

    fn clock() -> ExchangeClock {
        ExchangeClock::default()
    }

    /// 5-minute bars covering the given local window on a date.
    fn five_minute_series(
        date: NaiveDate,
        from: (u32, u32),
        count: usize,
        base: f64,
    ) -> BarSeries {
        let clock = clock();
        let start = clock.to_utc(clock.localize(
            date,
            NaiveTime::from_hms_opt(from.0, from.1, 0).expect("time"),
        ));
        let bars = (0..count)
            .map(|i| {
                let price = base + i as f64;
                Bar::new(
                    start + Duration::minutes(5 * i as i64),
                    price,
                    price + 3.0,
                    price - 3.0,
                    price + 1.0,
                    500,
                )
                .expect("valid bar")
            })
            .collect();
        BarSeries::new(
            Symbol::parse("NQ=F").expect("valid"),
            Interval::FiveMinutes,
            bars,
        )
        .expect("valid series")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn asian_session_starts_on_prior_date() {
        let agg = SessionAggregator::default();
        let (start, end) = agg.bounds(SessionKind::Asian, date(2025, 11, 19));

        let start_local = clock().to_local(start);
        let end_local = clock().to_local(end);
        assert_eq!(start_local.date_naive(), date(2025, 11, 18));
        assert_eq!(start_local.hour(), 18);
        assert_eq!(end_local.date_naive(), date(2025, 11, 19));
        assert_eq!(end_local.hour(), 2);
    }

    #[test]
    fn london_range_covers_only_window_bars() {
        let agg = SessionAggregator::default();
        let target = date(2025, 11, 19);
        // Bars from 02:30 to 06:55 local; London is [03:00, 06:00).
        let series = five_minute_series(target, (2, 30), 54, 100.0);

        let range = agg.range_for(&series, SessionKind::London, target, None);
        // 03:00..05:55 inclusive = 36 bars (06:00 exclusive).
        assert_eq!(range.bar_count, 36);
        assert!(range.high.is_some());
        assert!(range.low.is_some());
        assert_eq!(
            range.range,
            Some(range.high.expect("set") - range.low.expect("set"))
        );
    }

    #[test]
    fn empty_window_yields_zero_bar_count_without_error() {
        let agg = SessionAggregator::default();
        let target = date(2025, 11, 19);
        let series = five_minute_series(target, (3, 0), 10, 100.0);

        let range = agg.range_for(&series, SessionKind::NyPm, target, None);
        assert_eq!(range, SessionRange::default());
        assert_eq!(range.bar_count, 0);
    }

    #[test]
    fn is_active_only_within_window_on_current_day() {
        let agg = SessionAggregator::default();
        let target = date(2025, 11, 19);
        let series = five_minute_series(target, (8, 30), 42, 100.0);

        let during = clock().to_utc(clock().localize(
            target,
            NaiveTime::from_hms_opt(10, 0, 0).expect("time"),
        ));
        let active = agg.range_for(&series, SessionKind::NyAm, target, Some(during));
        assert!(active.is_active);

        let after = clock().to_utc(clock().localize(
            target,
            NaiveTime::from_hms_opt(13, 0, 0).expect("time"),
        ));
        let inactive = agg.range_for(&series, SessionKind::NyAm, target, Some(after));
        assert!(!inactive.is_active);

        // Previous-day queries are never active.
        let previous = agg.range_for(&series, SessionKind::NyAm, target, None);
        assert!(!previous.is_active);
    }

    #[test]
    fn price_position_against_range() {
        let range = SessionRange {
            high: Some(110.0),
            low: Some(100.0),
            range: Some(10.0),
            bar_count: 12,
            is_active: false,
        };

        assert_eq!(range.position_of(105.0), Some(PricePosition::Within));
        assert_eq!(range.position_of(111.0), Some(PricePosition::Above));
        assert_eq!(range.position_of(99.0), Some(PricePosition::Below));
        assert_eq!(SessionRange::default().position_of(100.0), None);
    }

    #[test]
    fn current_and_previous_day_cover_all_sessions() {
        let agg = SessionAggregator::default();
        let target = date(2025, 11, 19);
        let series = five_minute_series(target, (8, 30), 42, 100.0);
        let now = clock().to_utc(clock().localize(
            target,
            NaiveTime::from_hms_opt(10, 0, 0).expect("time"),
        ));

        let current = agg.current_day(&series, now);
        assert_eq!(current.len(), 4);
        let previous = agg.previous_day(&series, now);
        assert_eq!(previous.len(), 4);
        assert!(previous.iter().all(|(_, range)| !range.is_active));
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let agg = SessionAggregator::default();
        let target = date(2025, 11, 19);
        let series = five_minute_series(target, (8, 30), 42, 100.0);

        let first = agg.range_for(&series, SessionKind::NyAm, target, None);
        let second = agg.range_for(&series, SessionKind::NyAm, target, None);
        assert_eq!(first, second);
    }
}
