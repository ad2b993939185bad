//! Market calendar state machine for 24-hour futures.
//!
//! Default schedule (exchange-local): open Sunday 18:00 through Friday
//! 17:00, with a daily 17:00-18:00 maintenance halt Monday through
//! Thursday. Friday 17:00 starts the weekend, so the Friday slot is
//! CLOSED rather than MAINTENANCE; Saturday is always CLOSED. At a
//! boundary instant the later state takes effect.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::Serialize;

use crate::tz::ExchangeClock;

/// Trading state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketState {
    Open,
    Closed,
    Maintenance,
}

impl MarketState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

impl std::fmt::Display for MarketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of the next schedule transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Open,
    Close,
}

/// Upcoming schedule transition with a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketEvent {
    pub kind: EventKind,
    pub at: DateTime<Utc>,
    pub countdown_secs: i64,
}

impl MarketEvent {
    /// Countdown formatted as whole hours and minutes, e.g. `"41h 12m"`.
    pub fn countdown_label(&self) -> String {
        let hours = self.countdown_secs / 3600;
        let minutes = (self.countdown_secs % 3600) / 60;
        format!("{hours}h {minutes}m")
    }
}

/// Weekly trading schedule in exchange-local wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub maintenance_start: NaiveTime,
    pub maintenance_end: NaiveTime,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            open_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            close_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            maintenance_start: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            maintenance_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Pure market-state machine over the weekly schedule. No I/O, no
/// persisted state beyond the schedule constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarketCalendar {
    clock: ExchangeClock,
    schedule: WeeklySchedule,
}

impl MarketCalendar {
    pub fn new(clock: ExchangeClock, schedule: WeeklySchedule) -> Self {
        Self { clock, schedule }
    }

    pub const fn clock(&self) -> &ExchangeClock {
        &self.clock
    }

    /// Trading state at `instant`. Total over all instants.
    pub fn state(&self, instant: DateTime<Utc>) -> MarketState {
        let local = self.clock.to_local(instant);
        let time = local.time();

        match local.weekday() {
            Weekday::Fri if time >= self.schedule.close_time => MarketState::Closed,
            Weekday::Sat => MarketState::Closed,
            Weekday::Sun if time < self.schedule.open_time => MarketState::Closed,
            Weekday::Sun => MarketState::Open,
            _ if time >= self.schedule.maintenance_start
                && time < self.schedule.maintenance_end =>
            {
                MarketState::Maintenance
            }
            _ => MarketState::Open,
        }
    }

    pub fn is_open(&self, instant: DateTime<Utc>) -> bool {
        self.state(instant) == MarketState::Open
    }

    /// Next schedule transition after `instant`.
    ///
    /// While OPEN the next event is the weekly Friday close; otherwise it
    /// is the upcoming Sunday open (so a Monday maintenance halt counts
    /// down to the weekly open, matching the dashboard the schedule was
    /// built for).
    pub fn next_event(&self, instant: DateTime<Utc>) -> MarketEvent {
        let local = self.clock.to_local(instant);

        let (kind, target_day, target_time) = if self.state(instant) == MarketState::Open {
            (EventKind::Close, Weekday::Fri, self.schedule.close_time)
        } else {
            (EventKind::Open, Weekday::Sun, self.schedule.open_time)
        };

        let days_ahead = i64::from(
            (target_day.num_days_from_monday() + 7 - local.weekday().num_days_from_monday()) % 7,
        );
        let mut candidate_date = local.date_naive() + Duration::days(days_ahead);
        let mut at = self
            .clock
            .to_utc(self.clock.localize(candidate_date, target_time));
        if at <= instant {
            candidate_date += Duration::days(7);
            at = self
                .clock
                .to_utc(self.clock.localize(candidate_date, target_time));
        }

        let countdown_secs = (at - instant).num_seconds().max(0);
        MarketEvent {
            kind,
            at,
            countdown_secs,
        }
    }
}
