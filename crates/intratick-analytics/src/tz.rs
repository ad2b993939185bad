//! Exchange-local time conversions and calendar anchors.
//!
//! All window logic in this crate goes through [`ExchangeClock`]; nothing
//! else performs zone math. Conversions use the tz database, so daylight
//! saving transitions are handled without fixed offsets. Ambiguous wall
//! times (fall-back hour) resolve to the earlier mapping; nonexistent wall
//! times (spring-forward gap) roll forward.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

/// Converts between provider time (UTC) and exchange-local time and
/// derives the calendar anchors used by the analytics engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeClock {
    zone: Tz,
}

impl Default for ExchangeClock {
    fn default() -> Self {
        // CME equity-index futures quote in US Eastern time.
        Self::new(chrono_tz::America::New_York)
    }
}

impl ExchangeClock {
    pub const fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub const fn zone(&self) -> Tz {
        self.zone
    }

    /// Exchange-local view of an instant. Idempotent with [`to_utc`].
    ///
    /// [`to_utc`]: ExchangeClock::to_utc
    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.zone)
    }

    pub fn to_utc(&self, local: DateTime<Tz>) -> DateTime<Utc> {
        local.with_timezone(&Utc)
    }

    /// Resolve a local wall-clock time to an instant.
    pub fn localize(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
        let naive = date.and_time(time);
        match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(instant) => instant,
            LocalResult::Ambiguous(earlier, _later) => earlier,
            LocalResult::None => {
                // Inside the spring-forward gap: roll past it.
                let shifted = naive + Duration::hours(1);
                self.zone
                    .from_local_datetime(&shifted)
                    .earliest()
                    .unwrap_or_else(|| self.zone.from_utc_datetime(&naive))
            }
        }
    }

    /// Midnight local on the instant's local calendar date.
    pub fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        let local = self.to_local(instant);
        self.localize(local.date_naive(), NaiveTime::MIN)
    }

    /// Monday 00:00 local of the instant's week.
    pub fn start_of_week(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        let local = self.to_local(instant);
        let days_back = i64::from(local.weekday().num_days_from_monday());
        let monday = local.date_naive() - Duration::days(days_back);
        self.localize(monday, NaiveTime::MIN)
    }

    /// First of the month, 00:00 local.
    pub fn start_of_month(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        let local = self.to_local(instant);
        let first = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)
            .unwrap_or_else(|| local.date_naive());
        self.localize(first, NaiveTime::MIN)
    }

    /// Top of the instant's local clock hour.
    pub fn start_of_hour(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        let local = self.to_local(instant);
        let time = NaiveTime::from_hms_opt(local.hour(), 0, 0).unwrap_or(NaiveTime::MIN);
        self.localize(local.date_naive(), time)
    }

    /// Start of the instant's local 15-minute block.
    pub fn start_of_quarter_hour(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        let local = self.to_local(instant);
        let minute = local.minute() / 15 * 15;
        let time = NaiveTime::from_hms_opt(local.hour(), minute, 0).unwrap_or(NaiveTime::MIN);
        self.localize(local.date_naive(), time)
    }

    /// Fixed clock anchor (e.g. 07:00, 08:30) on the instant's local date.
    pub fn anchor(&self, instant: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Tz> {
        let local = self.to_local(instant);
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        self.localize(local.date_naive(), time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> ExchangeClock {
        ExchangeClock::default()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid utc time")
    }

    #[test]
    fn local_conversion_round_trips() {
        let clock = clock();
        let instant = utc(2025, 11, 17, 15, 45, 28);

        let local = clock.to_local(instant);
        let back = clock.to_utc(local);
        assert_eq!(back, instant);
        assert_eq!(clock.to_local(back), local, "conversion is idempotent");
    }

    #[test]
    fn respects_dst_offset_changes() {
        let clock = clock();

        // July: EDT, UTC-4.
        let summer = clock.to_local(utc(2025, 7, 1, 16, 0, 0));
        assert_eq!(summer.hour(), 12);

        // January: EST, UTC-5.
        let winter = clock.to_local(utc(2025, 1, 2, 16, 0, 0));
        assert_eq!(winter.hour(), 11);
    }

    #[test]
    fn week_starts_monday_midnight() {
        let clock = clock();
        // 2025-11-19 is a Wednesday.
        let start = clock.start_of_week(utc(2025, 11, 19, 15, 0, 0));
        assert_eq!(start.weekday(), chrono::Weekday::Mon);
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 17).expect("date"));
        assert_eq!(start.time(), NaiveTime::MIN);
    }

    #[test]
    fn month_starts_on_the_first() {
        let clock = clock();
        let start = clock.start_of_month(utc(2025, 11, 19, 15, 0, 0));
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 1).expect("date"));
    }

    #[test]
    fn quarter_hour_truncates_minutes() {
        let clock = clock();
        // 10:44 ET == 15:44 UTC in November (EST).
        let start = clock.start_of_quarter_hour(utc(2025, 11, 19, 15, 44, 30));
        assert_eq!(start.time(), NaiveTime::from_hms_opt(10, 30, 0).expect("time"));
    }

    #[test]
    fn nonexistent_wall_time_rolls_forward() {
        let clock = clock();
        // 2025-03-09 02:30 ET does not exist (spring forward).
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).expect("date");
        let time = NaiveTime::from_hms_opt(2, 30, 0).expect("time");
        let resolved = clock.localize(date, time);
        assert_eq!(resolved.hour(), 3, "gap times resolve past the jump");
    }

    #[test]
    fn anchor_lands_on_local_date() {
        let clock = clock();
        let anchor = clock.anchor(utc(2025, 11, 19, 15, 0, 0), 8, 30);
        assert_eq!(anchor.time(), NaiveTime::from_hms_opt(8, 30, 0).expect("time"));
        assert_eq!(anchor.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 19).expect("date"));
    }
}
