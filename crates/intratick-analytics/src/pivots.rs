//! Fibonacci pivot levels from a single high/low/close triple.
//!
//! `PP = (H + L + C) / 3`, resistances at `PP + {1.0, 1.618, 2.0} * range`,
//! supports mirrored below. Pivot sets are pure values recomputed per
//! request and never cached across bars.

use serde::Serialize;

use intratick_core::Bar;

/// Named pivot levels, resistance-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PivotLevel {
    R3,
    R2,
    R1,
    #[serde(rename = "PP")]
    Pp,
    S1,
    S2,
    S3,
}

impl PivotLevel {
    pub const ALL: [PivotLevel; 7] = [
        Self::R3,
        Self::R2,
        Self::R1,
        Self::Pp,
        Self::S1,
        Self::S2,
        Self::S3,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::R3 => "R3",
            Self::R2 => "R2",
            Self::R1 => "R1",
            Self::Pp => "PP",
            Self::S1 => "S1",
            Self::S2 => "S2",
            Self::S3 => "S3",
        }
    }
}

impl std::fmt::Display for PivotLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source bar timeframe a pivot set was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotTimeframe {
    Daily,
    Weekly,
}

/// The seven pivot levels of one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotSet {
    pub r3: f64,
    pub r2: f64,
    pub r1: f64,
    pub pp: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotSet {
    pub fn from_hlc(high: f64, low: f64, close: f64) -> Self {
        let pp = (high + low + close) / 3.0;
        let range = high - low;

        Self {
            r3: pp + 2.0 * range,
            r2: pp + 1.618 * range,
            r1: pp + range,
            pp,
            s1: pp - range,
            s2: pp - 1.618 * range,
            s3: pp - 2.0 * range,
        }
    }

    pub fn from_bar(bar: &Bar) -> Self {
        Self::from_hlc(bar.high, bar.low, bar.close)
    }

    pub const fn level(&self, level: PivotLevel) -> f64 {
        match level {
            PivotLevel::R3 => self.r3,
            PivotLevel::R2 => self.r2,
            PivotLevel::R1 => self.r1,
            PivotLevel::Pp => self.pp,
            PivotLevel::S1 => self.s1,
            PivotLevel::S2 => self.s2,
            PivotLevel::S3 => self.s3,
        }
    }

    /// Signed distances `price - level` for all seven levels.
    pub fn distances(&self, price: f64) -> [(PivotLevel, f64); 7] {
        PivotLevel::ALL.map(|level| (level, price - self.level(level)))
    }
}

/// The pivot nearest to the current price across both timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClosestPivot {
    pub timeframe: PivotTimeframe,
    pub level: PivotLevel,
    pub price: f64,
    pub distance: f64,
}

/// Rank all 14 levels (7 daily + 7 weekly) by absolute distance.
pub fn closest_pivot(daily: &PivotSet, weekly: &PivotSet, price: f64) -> ClosestPivot {
    let mut best = ClosestPivot {
        timeframe: PivotTimeframe::Daily,
        level: PivotLevel::Pp,
        price: daily.pp,
        distance: price - daily.pp,
    };

    for (timeframe, set) in [
        (PivotTimeframe::Daily, daily),
        (PivotTimeframe::Weekly, weekly),
    ] {
        for (level, distance) in set.distances(price) {
            if distance.abs() < best.distance.abs() {
                best = ClosestPivot {
                    timeframe,
                    level,
                    price: set.level(level),
                    distance,
                };
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_exact_levels_for_reference_triple() {
        let set = PivotSet::from_hlc(110.0, 90.0, 100.0);

        assert_eq!(set.pp, 100.0);
        assert_eq!(set.r1, 120.0);
        assert_eq!(set.s1, 80.0);
        assert_eq!(set.r3, 140.0);
        assert_eq!(set.s3, 60.0);
        assert!((set.r2 - 132.36).abs() < 1e-9);
        assert!((set.s2 - 67.64).abs() < 1e-9);
    }

    #[test]
    fn distances_are_signed() {
        let set = PivotSet::from_hlc(110.0, 90.0, 100.0);
        let distances = set.distances(105.0);

        let pp = distances
            .iter()
            .find(|(level, _)| *level == PivotLevel::Pp)
            .expect("PP present");
        assert_eq!(pp.1, 5.0);

        let r1 = distances
            .iter()
            .find(|(level, _)| *level == PivotLevel::R1)
            .expect("R1 present");
        assert_eq!(r1.1, -15.0);
    }

    #[test]
    fn closest_pivot_spans_both_timeframes() {
        let daily = PivotSet::from_hlc(110.0, 90.0, 100.0);
        let weekly = PivotSet::from_hlc(130.0, 85.0, 118.0);

        // Weekly PP = 111; price 112 is closer to it than any daily level.
        let closest = closest_pivot(&daily, &weekly, 112.0);
        assert_eq!(closest.timeframe, PivotTimeframe::Weekly);
        assert_eq!(closest.level, PivotLevel::Pp);
        assert_eq!(closest.distance, 1.0);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let first = PivotSet::from_hlc(110.0, 90.0, 100.0);
        let second = PivotSet::from_hlc(110.0, 90.0, 100.0);
        assert_eq!(first, second);
    }
}
