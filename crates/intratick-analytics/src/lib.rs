//! # Intratick Analytics
//!
//! Intraday analytics over OHLCV bar series: market calendar state,
//! reference price levels, session ranges, Fibonacci pivots, and hourly
//! block segmentation.
//!
//! Every engine in this crate is a pure function over an already-fetched
//! [`BarSeries`](intratick_core::BarSeries): no I/O, no hidden state, safe
//! to run from any number of threads. The [`service`] module wires the
//! engines to the acquisition layer for callers that want ready-made
//! reports.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`blocks`] | 7-block hour segmentation with per-block OHLC |
//! | [`calendar`] | OPEN/CLOSED/MAINTENANCE state machine + next event |
//! | [`levels`] | 16 reference levels and proximity signals |
//! | [`pivots`] | Fibonacci pivot sets and closest-pivot ranking |
//! | [`service`] | Async report builders over the fetcher |
//! | [`sessions`] | Asian/London/NY-AM/NY-PM range aggregation |
//! | [`tz`] | Exchange-local time conversions and calendar anchors |

pub mod blocks;
pub mod calendar;
pub mod levels;
pub mod pivots;
pub mod service;
pub mod sessions;
pub mod tz;

pub use blocks::{Block, BlockOhlc, BlockSegmenter, HourBlocks, BLOCKS_PER_HOUR};

pub use calendar::{EventKind, MarketCalendar, MarketEvent, MarketState, WeeklySchedule};

pub use levels::{
    signal_for, ClosestLevel, LevelEngine, LevelKind, LevelSignal, Proximity, ReferenceLevels,
    NEAR_THRESHOLD_PCT,
};

pub use pivots::{closest_pivot, ClosestPivot, PivotLevel, PivotSet, PivotTimeframe};

pub use service::{
    AnalyticsService, BlockReport, LevelReport, LevelSignalEntry, MarketStatusReport, PivotReport,
    SessionEntry, SessionReport,
};

pub use sessions::{
    PricePosition, SessionAggregator, SessionKind, SessionRange, SessionWindow,
};

pub use tz::ExchangeClock;
