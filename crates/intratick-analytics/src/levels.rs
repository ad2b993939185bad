//! Reference level engine: 16 named anchor prices plus proximity signals.
//!
//! Levels are computed from the series granularity the anchor needs:
//! hourly bars for the periodic opens, minute bars for the 15-minute open,
//! daily bars for the prior extrema. A level whose prerequisite data is
//! missing resolves to `None`; that is a normal outcome, never an error,
//! and it propagates through signal computation as a `None` signal.

use chrono::{DateTime, Utc};
use serde::Serialize;

use intratick_core::{Bar, BarSeries};

use crate::tz::ExchangeClock;

/// Price within this percentage of a level counts as NEAR.
pub const NEAR_THRESHOLD_PCT: f64 = 0.10;

/// The 16 reference level identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    WeeklyOpen,
    MonthlyOpen,
    DailyOpenMidnight,
    NyOpen0830,
    NyOpen0700,
    FourHourOpen,
    TwoHourOpen,
    HourlyOpen,
    PreviousHourlyOpen,
    FifteenMinOpen,
    PreviousDayHigh,
    PreviousDayLow,
    PreviousWeekHigh,
    PreviousWeekLow,
    WeeklyHigh,
    WeeklyLow,
}

impl LevelKind {
    pub const ALL: [LevelKind; 16] = [
        Self::WeeklyOpen,
        Self::MonthlyOpen,
        Self::DailyOpenMidnight,
        Self::NyOpen0830,
        Self::NyOpen0700,
        Self::FourHourOpen,
        Self::TwoHourOpen,
        Self::HourlyOpen,
        Self::PreviousHourlyOpen,
        Self::FifteenMinOpen,
        Self::PreviousDayHigh,
        Self::PreviousDayLow,
        Self::PreviousWeekHigh,
        Self::PreviousWeekLow,
        Self::WeeklyHigh,
        Self::WeeklyLow,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WeeklyOpen => "weekly_open",
            Self::MonthlyOpen => "monthly_open",
            Self::DailyOpenMidnight => "daily_open_midnight",
            Self::NyOpen0830 => "ny_open_0830",
            Self::NyOpen0700 => "ny_open_0700",
            Self::FourHourOpen => "four_hour_open",
            Self::TwoHourOpen => "two_hour_open",
            Self::HourlyOpen => "hourly_open",
            Self::PreviousHourlyOpen => "previous_hourly_open",
            Self::FifteenMinOpen => "fifteen_min_open",
            Self::PreviousDayHigh => "previous_day_high",
            Self::PreviousDayLow => "previous_day_low",
            Self::PreviousWeekHigh => "previous_week_high",
            Self::PreviousWeekLow => "previous_week_low",
            Self::WeeklyHigh => "weekly_high",
            Self::WeeklyLow => "weekly_low",
        }
    }
}

impl std::fmt::Display for LevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of current price against a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Proximity {
    Above,
    Near,
    Below,
}

/// Signal derived from one level and the current price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelSignal {
    pub price: f64,
    pub distance: f64,
    pub distance_pct: f64,
    pub proximity: Proximity,
    /// +1 above, 0 near, -1 below.
    pub signal: i8,
}

/// The single level nearest to the current price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClosestLevel {
    pub kind: LevelKind,
    pub price: f64,
    pub distance: f64,
    pub proximity: Proximity,
}

/// All 16 resolved levels. `None` means insufficient data for that anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ReferenceLevels {
    pub weekly_open: Option<f64>,
    pub monthly_open: Option<f64>,
    pub daily_open_midnight: Option<f64>,
    pub ny_open_0830: Option<f64>,
    pub ny_open_0700: Option<f64>,
    pub four_hour_open: Option<f64>,
    pub two_hour_open: Option<f64>,
    pub hourly_open: Option<f64>,
    pub previous_hourly_open: Option<f64>,
    pub fifteen_min_open: Option<f64>,
    pub previous_day_high: Option<f64>,
    pub previous_day_low: Option<f64>,
    pub previous_week_high: Option<f64>,
    pub previous_week_low: Option<f64>,
    pub weekly_high: Option<f64>,
    pub weekly_low: Option<f64>,
}

impl ReferenceLevels {
    pub fn get(&self, kind: LevelKind) -> Option<f64> {
        match kind {
            LevelKind::WeeklyOpen => self.weekly_open,
            LevelKind::MonthlyOpen => self.monthly_open,
            LevelKind::DailyOpenMidnight => self.daily_open_midnight,
            LevelKind::NyOpen0830 => self.ny_open_0830,
            LevelKind::NyOpen0700 => self.ny_open_0700,
            LevelKind::FourHourOpen => self.four_hour_open,
            LevelKind::TwoHourOpen => self.two_hour_open,
            LevelKind::HourlyOpen => self.hourly_open,
            LevelKind::PreviousHourlyOpen => self.previous_hourly_open,
            LevelKind::FifteenMinOpen => self.fifteen_min_open,
            LevelKind::PreviousDayHigh => self.previous_day_high,
            LevelKind::PreviousDayLow => self.previous_day_low,
            LevelKind::PreviousWeekHigh => self.previous_week_high,
            LevelKind::PreviousWeekLow => self.previous_week_low,
            LevelKind::WeeklyHigh => self.weekly_high,
            LevelKind::WeeklyLow => self.weekly_low,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LevelKind, Option<f64>)> + '_ {
        LevelKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    /// Signal per level; unresolved levels yield `None` signals.
    pub fn signals(&self, current_price: f64) -> Vec<(LevelKind, Option<LevelSignal>)> {
        self.iter()
            .map(|(kind, level)| (kind, level.map(|price| signal_for(current_price, price))))
            .collect()
    }

    /// The resolved level nearest to the current price.
    pub fn closest(&self, current_price: f64) -> Option<ClosestLevel> {
        let mut best: Option<ClosestLevel> = None;
        for (kind, level) in self.iter() {
            let Some(price) = level else { continue };
            let signal = signal_for(current_price, price);
            let replace = best
                .map(|b| signal.distance.abs() < b.distance.abs())
                .unwrap_or(true);
            if replace {
                best = Some(ClosestLevel {
                    kind,
                    price,
                    distance: signal.distance,
                    proximity: signal.proximity,
                });
            }
        }
        best
    }
}

/// Proximity/signal classification for one level.
pub fn signal_for(current_price: f64, level: f64) -> LevelSignal {
    if level == 0.0 {
        return LevelSignal {
            price: level,
            distance: current_price,
            distance_pct: 0.0,
            proximity: Proximity::Near,
            signal: 0,
        };
    }

    let distance = current_price - level;
    let distance_pct = distance / level * 100.0;

    let (proximity, signal) = if distance_pct.abs() < NEAR_THRESHOLD_PCT {
        (Proximity::Near, 0)
    } else if distance > 0.0 {
        (Proximity::Above, 1)
    } else {
        (Proximity::Below, -1)
    };

    LevelSignal {
        price: level,
        distance,
        distance_pct,
        proximity,
        signal,
    }
}

/// Computes the 16 reference levels from hourly, daily, and minute series.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelEngine {
    clock: ExchangeClock,
}

impl LevelEngine {
    pub fn new(clock: ExchangeClock) -> Self {
        Self { clock }
    }

    /// Resolve every level. Missing prerequisite data yields `None` for
    /// the affected levels without failing the others.
    pub fn compute(
        &self,
        hourly: &BarSeries,
        daily: &BarSeries,
        minute: Option<&BarSeries>,
        now: DateTime<Utc>,
    ) -> ReferenceLevels {
        let clock = &self.clock;

        let (previous_day_high, previous_day_low) = previous_day_extrema(daily);
        let (weekly_high, weekly_low) = running_week_extrema(daily);

        ReferenceLevels {
            weekly_open: anchored_open(
                hourly,
                clock.to_utc(clock.start_of_week(now)),
                Fallback::FirstOpen,
            ),
            monthly_open: anchored_open(
                hourly,
                clock.to_utc(clock.start_of_month(now)),
                Fallback::FirstOpen,
            ),
            daily_open_midnight: anchored_open(
                hourly,
                clock.to_utc(clock.start_of_day(now)),
                Fallback::FirstOpen,
            ),
            ny_open_0830: anchored_open(
                hourly,
                clock.to_utc(clock.anchor(now, 8, 30)),
                Fallback::LastOpen,
            ),
            ny_open_0700: anchored_open(
                hourly,
                clock.to_utc(clock.anchor(now, 7, 0)),
                Fallback::LastOpen,
            ),
            four_hour_open: open_from_end(hourly, 4, Fallback::FirstOpen),
            two_hour_open: open_from_end(hourly, 2, Fallback::FirstOpen),
            hourly_open: hourly.last().map(|bar| bar.open),
            previous_hourly_open: open_from_end(hourly, 2, Fallback::LastOpen),
            fifteen_min_open: minute.and_then(|series| {
                anchored_open(
                    series,
                    clock.to_utc(clock.start_of_quarter_hour(now)),
                    Fallback::FirstOpen,
                )
            }),
            previous_day_high,
            previous_day_low,
            previous_week_high: previous_week_extreme(daily, Extreme::High),
            previous_week_low: previous_week_extreme(daily, Extreme::Low),
            weekly_high,
            weekly_low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    FirstOpen,
    LastOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    High,
    Low,
}

/// Open of the first bar at or after `anchor`, with the original's
/// fallback when no bar reaches the anchor.
fn anchored_open(series: &BarSeries, anchor: DateTime<Utc>, fallback: Fallback) -> Option<f64> {
    if let Some(bar) = series.first_at_or_after(anchor) {
        return Some(bar.open);
    }
    match fallback {
        Fallback::FirstOpen => series.first().map(|bar| bar.open),
        Fallback::LastOpen => series.last().map(|bar| bar.open),
    }
}

/// Open of the bar `offset` positions from the end (1 = last bar).
fn open_from_end(series: &BarSeries, offset: usize, fallback: Fallback) -> Option<f64> {
    if series.len() >= offset {
        return series.bars.get(series.len() - offset).map(|bar| bar.open);
    }
    match fallback {
        Fallback::FirstOpen => series.first().map(|bar| bar.open),
        Fallback::LastOpen => series.last().map(|bar| bar.open),
    }
}

/// High/low of the second-to-last daily bar; a single bar stands in for
/// itself.
fn previous_day_extrema(daily: &BarSeries) -> (Option<f64>, Option<f64>) {
    let bar = match daily.len() {
        0 => None,
        1 => daily.first(),
        n => daily.bars.get(n - 2),
    };
    (bar.map(|b| b.high), bar.map(|b| b.low))
}

/// Positional previous-week window over daily bars: `[len-13, len-7)`.
///
/// A deliberate approximation of the prior calendar week that drifts on
/// holiday-shortened weeks; shorter series degrade to the whole series.
fn previous_week_extreme(daily: &BarSeries, extreme: Extreme) -> Option<f64> {
    let n = daily.len();
    let window: &[Bar] = if n >= 7 {
        let start = n.saturating_sub(13);
        let end = n - 6;
        &daily.bars[start..end]
    } else {
        &daily.bars[..]
    };

    fold_extreme(window, extreme)
}

/// Running week-to-date extrema: the last five daily bars.
fn running_week_extrema(daily: &BarSeries) -> (Option<f64>, Option<f64>) {
    let start = daily.len().saturating_sub(5);
    let window = &daily.bars[start..];
    (
        fold_extreme(window, Extreme::High),
        fold_extreme(window, Extreme::Low),
    )
}

fn fold_extreme(bars: &[Bar], extreme: Extreme) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    Some(match extreme {
        Extreme::High => bars.iter().map(|b| b.high).fold(f64::MIN, f64::max),
        Extreme::Low => bars.iter().map(|b| b.low).fold(f64::MAX, f64::min),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use intratick_core::{Bar, Interval, Symbol};

    use super::*;

    fn series(interval: Interval, step_mins: i64, opens: &[f64]) -> BarSeries {
        let start = Utc
            .with_ymd_and_hms(2025, 11, 19, 10, 0, 0)
            .single()
            .expect("valid");
        let bars = opens
            .iter()
            .enumerate()
            .map(|(i, &open)| {
                Bar::new(
                    start + chrono::Duration::minutes(step_mins * i as i64),
                    open,
                    open + 2.0,
                    open - 2.0,
                    open + 1.0,
                    100,
                )
                .expect("valid bar")
            })
            .collect();
        BarSeries::new(Symbol::parse("NQ=F").expect("valid"), interval, bars).expect("valid")
    }

    #[test]
    fn hourly_and_previous_hourly_opens_use_positional_offsets() {
        let hourly = series(Interval::OneHour, 60, &[100.0, 101.0, 102.0, 103.0, 104.0]);
        let daily = series(Interval::OneDay, 1440, &[100.0]);
        let engine = LevelEngine::default();
        let now = hourly.last().expect("non-empty").ts;

        let levels = engine.compute(&hourly, &daily, None, now);
        assert_eq!(levels.hourly_open, Some(104.0));
        assert_eq!(levels.previous_hourly_open, Some(103.0));
        assert_eq!(levels.four_hour_open, Some(101.0));
        assert_eq!(levels.two_hour_open, Some(103.0));
    }

    #[test]
    fn short_series_falls_back_positionally() {
        let hourly = series(Interval::OneHour, 60, &[100.0]);
        let daily = series(Interval::OneDay, 1440, &[100.0]);
        let engine = LevelEngine::default();
        let now = hourly.last().expect("non-empty").ts;

        let levels = engine.compute(&hourly, &daily, None, now);
        // One bar: every positional open degrades to that bar.
        assert_eq!(levels.four_hour_open, Some(100.0));
        assert_eq!(levels.previous_hourly_open, Some(100.0));
        assert_eq!(levels.hourly_open, Some(100.0));
    }

    #[test]
    fn previous_day_extrema_use_second_to_last_bar() {
        let daily = series(Interval::OneDay, 1440, &[100.0, 110.0, 120.0]);
        assert_eq!(previous_day_extrema(&daily), (Some(112.0), Some(108.0)));

        let single = series(Interval::OneDay, 1440, &[100.0]);
        assert_eq!(previous_day_extrema(&single), (Some(102.0), Some(98.0)));
    }

    #[test]
    fn previous_week_window_is_positional() {
        // 15 daily bars with increasing opens; window is [2, 9).
        let opens: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let daily = series(Interval::OneDay, 1440, &opens);

        // Highs are open + 2; max over bars 2..=8 is 108 + 2.
        assert_eq!(previous_week_extreme(&daily, Extreme::High), Some(110.0));
        // Lows are open - 2; min over bars 2..=8 is 102 - 2.
        assert_eq!(previous_week_extreme(&daily, Extreme::Low), Some(100.0));
    }

    #[test]
    fn running_week_uses_last_five_bars() {
        let opens: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let daily = series(Interval::OneDay, 1440, &opens);

        let (high, low) = running_week_extrema(&daily);
        assert_eq!(high, Some(111.0)); // open 109 + 2
        assert_eq!(low, Some(103.0)); // open 105 - 2
    }

    #[test]
    fn fifteen_minute_open_requires_minute_data() {
        let hourly = series(Interval::OneHour, 60, &[100.0; 30]);
        let daily = series(Interval::OneDay, 1440, &[100.0; 10]);
        let engine = LevelEngine::default();
        let now = hourly.last().expect("non-empty").ts;

        let without = engine.compute(&hourly, &daily, None, now);
        assert_eq!(without.fifteen_min_open, None, "absent data is not an error");

        let minute = series(Interval::OneMinute, 1, &[200.0, 201.0, 202.0]);
        let with = engine.compute(&hourly, &daily, Some(&minute), now);
        assert!(with.fifteen_min_open.is_some());
    }

    #[test]
    fn near_threshold_classifies_signal() {
        let near = signal_for(100.05, 100.0);
        assert_eq!(near.proximity, Proximity::Near);
        assert_eq!(near.signal, 0);

        let above = signal_for(101.0, 100.0);
        assert_eq!(above.proximity, Proximity::Above);
        assert_eq!(above.signal, 1);
        assert_eq!(above.distance, 1.0);

        let below = signal_for(99.0, 100.0);
        assert_eq!(below.proximity, Proximity::Below);
        assert_eq!(below.signal, -1);
    }

    #[test]
    fn closest_level_minimizes_absolute_distance() {
        let levels = ReferenceLevels {
            weekly_open: Some(100.0),
            hourly_open: Some(104.5),
            previous_day_high: Some(110.0),
            ..ReferenceLevels::default()
        };

        let closest = levels.closest(105.0).expect("levels resolved");
        assert_eq!(closest.kind, LevelKind::HourlyOpen);
        assert_eq!(closest.distance, 0.5);
    }

    #[test]
    fn unresolved_levels_produce_none_signals() {
        let levels = ReferenceLevels {
            weekly_open: Some(100.0),
            ..ReferenceLevels::default()
        };

        let signals = levels.signals(101.0);
        assert_eq!(signals.len(), 16);
        let resolved = signals.iter().filter(|(_, s)| s.is_some()).count();
        assert_eq!(resolved, 1);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let hourly = series(Interval::OneHour, 60, &[100.0, 101.0, 102.0]);
        let daily = series(Interval::OneDay, 1440, &[100.0, 101.0]);
        let engine = LevelEngine::default();
        let now = hourly.last().expect("non-empty").ts;

        let first = engine.compute(&hourly, &daily, None, now);
        let second = engine.compute(&hourly, &daily, None, now);
        assert_eq!(first, second);
    }
}
