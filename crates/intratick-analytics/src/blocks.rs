//! Hourly block segmentation: the current clock hour split into seven
//! equal sub-blocks (~8.571 minutes each), with per-block OHLC from
//! 1-minute bars and hour progress.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use intratick_core::BarSeries;

use crate::tz::ExchangeClock;

pub const BLOCKS_PER_HOUR: usize = 7;

const HOUR_MS: i64 = 3_600_000;

/// Aggregated OHLC for one block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockOhlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub bar_count: usize,
}

/// One of the seven hour subdivisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Block {
    /// 1-based block number within the hour.
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_complete: bool,
    /// `None` when no 1-minute bars fell inside the block.
    pub ohlc: Option<BlockOhlc>,
}

/// Full segmentation of the current hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBlocks {
    pub hour_start: DateTime<Utc>,
    pub hour_end: DateTime<Utc>,
    pub blocks: Vec<Block>,
    /// 1-based number of the first incomplete block, or 7 once the hour
    /// has fully elapsed.
    pub current_block: usize,
    pub completed: usize,
    /// `completed / 7`.
    pub progress: f64,
    /// Fraction of the current block already elapsed, in [0, 1].
    pub time_in_block: f64,
}

/// Splits the local clock hour into seven equal blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockSegmenter {
    clock: ExchangeClock,
}

impl BlockSegmenter {
    pub fn new(clock: ExchangeClock) -> Self {
        Self { clock }
    }

    /// Segment the hour containing `now`, aggregating OHLC per block when
    /// a 1-minute series is supplied.
    pub fn segment(&self, minute: Option<&BarSeries>, now: DateTime<Utc>) -> HourBlocks {
        let hour_start = self.clock.to_utc(self.clock.start_of_hour(now));
        let hour_end = hour_start + Duration::milliseconds(HOUR_MS);

        let mut blocks = Vec::with_capacity(BLOCKS_PER_HOUR);
        for i in 0..BLOCKS_PER_HOUR {
            let start = hour_start + Duration::milliseconds(HOUR_MS * i as i64 / 7);
            let end = hour_start + Duration::milliseconds(HOUR_MS * (i as i64 + 1) / 7);

            blocks.push(Block {
                index: i + 1,
                start,
                end,
                is_complete: now >= end,
                ohlc: minute.and_then(|series| block_ohlc(series, start, end)),
            });
        }

        let completed = blocks.iter().filter(|block| block.is_complete).count();
        let current_block = blocks
            .iter()
            .find(|block| !block.is_complete)
            .map(|block| block.index)
            .unwrap_or(BLOCKS_PER_HOUR);

        // Index is 1-based and always in bounds.
        let current = &blocks[current_block - 1];
        let block_ms = (current.end - current.start).num_milliseconds();
        let elapsed_ms = (now - current.start).num_milliseconds();
        let time_in_block = if block_ms > 0 {
            (elapsed_ms as f64 / block_ms as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };

        HourBlocks {
            hour_start,
            hour_end,
            blocks,
            current_block,
            completed,
            progress: completed as f64 / BLOCKS_PER_HOUR as f64,
            time_in_block,
        }
    }
}

/// OHLC over the 1-minute bars in `[start, end)`.
fn block_ohlc(series: &BarSeries, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<BlockOhlc> {
    let bars = series.bars_between(start, end);
    let first = bars.first()?;
    let last = bars.last()?;

    Some(BlockOhlc {
        open: first.open,
        high: bars.iter().map(|b| b.high).fold(f64::MIN, f64::max),
        low: bars.iter().map(|b| b.low).fold(f64::MAX, f64::min),
        close: last.close,
        volume: bars.iter().map(|b| b.volume).sum(),
        bar_count: bars.len(),
    })
}
