//! Report builders combining the fetcher with the pure engines.
//!
//! Each builder fetches the series it needs through the shared
//! [`BarFetcher`] and returns a serializable report. Per-item gaps stay
//! `None`; only an exhausted acquisition ([`FetchError`]) aborts a report.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use intratick_core::{BarFetcher, FetchError, Interval, Symbol};

use crate::blocks::{BlockSegmenter, HourBlocks};
use crate::calendar::{MarketCalendar, MarketEvent, MarketState, WeeklySchedule};
use crate::levels::{ClosestLevel, LevelEngine, LevelKind, LevelSignal, ReferenceLevels};
use crate::pivots::{closest_pivot, ClosestPivot, PivotSet};
use crate::sessions::{PricePosition, SessionAggregator, SessionKind, SessionRange};
use crate::tz::ExchangeClock;

/// One level's signal entry in a [`LevelReport`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelSignalEntry {
    pub kind: LevelKind,
    pub signal: Option<LevelSignal>,
}

/// All reference levels with signals and the closest level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub symbol: Symbol,
    pub as_of: DateTime<Utc>,
    pub current_price: f64,
    /// True when any contributing series came from the stale fallback.
    pub stale: bool,
    pub levels: ReferenceLevels,
    pub signals: Vec<LevelSignalEntry>,
    pub closest: Option<ClosestLevel>,
}

/// One session's entry in a [`SessionReport`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionEntry {
    pub kind: SessionKind,
    pub range: SessionRange,
    pub position: Option<PricePosition>,
}

/// Current and previous-day session ranges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub symbol: Symbol,
    pub as_of: DateTime<Utc>,
    pub current_price: Option<f64>,
    pub stale: bool,
    pub current: Vec<SessionEntry>,
    pub previous: Vec<SessionEntry>,
}

/// Daily and weekly pivot sets with distances and the closest pivot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotReport {
    pub symbol: Symbol,
    pub as_of: DateTime<Utc>,
    pub current_price: f64,
    pub stale: bool,
    pub daily: PivotSet,
    pub weekly: PivotSet,
    pub closest: ClosestPivot,
}

/// Hour segmentation report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub symbol: Symbol,
    pub as_of: DateTime<Utc>,
    pub current_price: Option<f64>,
    pub stale: bool,
    pub hour: HourBlocks,
}

/// Market state with the upcoming transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStatusReport {
    pub symbol: Symbol,
    pub as_of: DateTime<Utc>,
    pub state: MarketState,
    pub is_open: bool,
    pub next_event: MarketEvent,
    pub countdown: String,
}

/// Facade wiring the acquisition layer to the pure analytics engines.
pub struct AnalyticsService {
    fetcher: Arc<BarFetcher>,
    calendar: MarketCalendar,
    levels: LevelEngine,
    sessions: SessionAggregator,
    blocks: BlockSegmenter,
}

impl AnalyticsService {
    pub fn new(fetcher: Arc<BarFetcher>) -> Self {
        Self::with_clock(fetcher, ExchangeClock::default())
    }

    pub fn with_clock(fetcher: Arc<BarFetcher>, clock: ExchangeClock) -> Self {
        Self {
            fetcher,
            calendar: MarketCalendar::new(clock, WeeklySchedule::default()),
            levels: LevelEngine::new(clock),
            sessions: SessionAggregator::new(clock),
            blocks: BlockSegmenter::new(clock),
        }
    }

    /// The 16 reference levels plus signals against the current price.
    ///
    /// The minute series is optional input for the 15-minute open: its
    /// absence nulls that level instead of failing the report.
    pub async fn level_report(
        &self,
        symbol: &Symbol,
        now: DateTime<Utc>,
    ) -> Result<LevelReport, FetchError> {
        let hourly = self.fetcher.fetch(symbol, Interval::OneHour).await?;
        let daily = self.fetcher.fetch(symbol, Interval::OneDay).await?;
        let minute = self.fetcher.fetch(symbol, Interval::OneMinute).await.ok();

        let current_price = match &minute {
            Some(outcome) => outcome.series.last().map(|bar| bar.close),
            None => None,
        };
        let current_price = match current_price {
            Some(price) => price,
            None => self.fetcher.current_price(symbol).await?,
        };

        let stale = hourly.is_stale()
            || daily.is_stale()
            || minute.as_ref().map(|m| m.is_stale()).unwrap_or(false);

        let levels = self.levels.compute(
            &hourly.series,
            &daily.series,
            minute.as_ref().map(|m| m.series.as_ref()),
            now,
        );

        let signals = levels
            .signals(current_price)
            .into_iter()
            .map(|(kind, signal)| LevelSignalEntry { kind, signal })
            .collect();

        debug!(%symbol, price = current_price, "computed level report");
        Ok(LevelReport {
            symbol: symbol.clone(),
            as_of: now,
            current_price,
            stale,
            levels,
            signals,
            closest: levels.closest(current_price),
        })
    }

    /// Current and previous-day ranges for the four sessions.
    pub async fn session_report(
        &self,
        symbol: &Symbol,
        now: DateTime<Utc>,
    ) -> Result<SessionReport, FetchError> {
        let five_minute = self.fetcher.fetch(symbol, Interval::FiveMinutes).await?;
        let current_price = self.fetcher.current_price(symbol).await.ok();

        let entry = |(kind, range): (SessionKind, SessionRange)| SessionEntry {
            kind,
            range,
            position: current_price.and_then(|price| range.position_of(price)),
        };

        Ok(SessionReport {
            symbol: symbol.clone(),
            as_of: now,
            current_price,
            stale: five_minute.is_stale(),
            current: self
                .sessions
                .current_day(&five_minute.series, now)
                .into_iter()
                .map(entry)
                .collect(),
            previous: self
                .sessions
                .previous_day(&five_minute.series, now)
                .into_iter()
                .map(|(kind, range)| SessionEntry {
                    kind,
                    range,
                    position: None,
                })
                .collect(),
        })
    }

    /// Fibonacci pivots from the latest daily and weekly bars.
    pub async fn pivot_report(
        &self,
        symbol: &Symbol,
        now: DateTime<Utc>,
    ) -> Result<PivotReport, FetchError> {
        let daily = self.fetcher.fetch(symbol, Interval::OneDay).await?;
        let weekly = self.fetcher.fetch(symbol, Interval::OneWeek).await?;
        let current_price = self.fetcher.current_price(symbol).await?;

        let daily_bar = daily.series.last().ok_or_else(|| FetchError::DataUnavailable {
            symbol: symbol.clone(),
            interval: Interval::OneDay,
            reason: String::from("series is empty"),
        })?;
        let weekly_bar = weekly
            .series
            .last()
            .ok_or_else(|| FetchError::DataUnavailable {
                symbol: symbol.clone(),
                interval: Interval::OneWeek,
                reason: String::from("series is empty"),
            })?;

        let daily_set = PivotSet::from_bar(daily_bar);
        let weekly_set = PivotSet::from_bar(weekly_bar);

        Ok(PivotReport {
            symbol: symbol.clone(),
            as_of: now,
            current_price,
            stale: daily.is_stale() || weekly.is_stale(),
            daily: daily_set,
            weekly: weekly_set,
            closest: closest_pivot(&daily_set, &weekly_set, current_price),
        })
    }

    /// Seven-block segmentation of the current hour.
    pub async fn block_report(
        &self,
        symbol: &Symbol,
        now: DateTime<Utc>,
    ) -> Result<BlockReport, FetchError> {
        let minute = self.fetcher.fetch(symbol, Interval::OneMinute).await?;
        let current_price = minute.series.last().map(|bar| bar.close);

        Ok(BlockReport {
            symbol: symbol.clone(),
            as_of: now,
            current_price,
            stale: minute.is_stale(),
            hour: self.blocks.segment(Some(&minute.series), now),
        })
    }

    /// Market state and next transition. Pure; performs no fetch.
    pub fn market_status(&self, symbol: &Symbol, now: DateTime<Utc>) -> MarketStatusReport {
        let state = self.calendar.state(now);
        let next_event = self.calendar.next_event(now);
        let countdown = next_event.countdown_label();

        MarketStatusReport {
            symbol: symbol.clone(),
            as_of: now,
            state,
            is_open: state == MarketState::Open,
            next_event,
            countdown,
        }
    }
}
