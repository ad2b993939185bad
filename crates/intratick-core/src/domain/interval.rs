use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Bar interval supported by the data acquisition layer.
///
/// Each interval carries the provider lookback window it is fetched with
/// and the validation floor applied to fetched series. The lookback windows
/// follow the upstream availability limits for intraday data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
}

impl Interval {
    pub const ALL: [Interval; 7] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::OneDay,
        Self::OneWeek,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
        }
    }

    /// Provider lookback window requested for this interval.
    pub const fn lookback_range(self) -> &'static str {
        match self {
            Self::OneMinute => "7d",
            Self::FiveMinutes | Self::FifteenMinutes | Self::ThirtyMinutes => "60d",
            Self::OneHour => "730d",
            Self::OneDay | Self::OneWeek => "max",
        }
    }

    /// Minimum bar count a fetched series must contain to be accepted.
    pub const fn min_bars(self) -> usize {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinutes => 12,
            Self::FifteenMinutes => 4,
            Self::ThirtyMinutes => 2,
            Self::OneHour => 24,
            Self::OneDay => 5,
            Self::OneWeek => 1,
        }
    }

    /// Whether the open/close-within-high/low check applies.
    ///
    /// Daily and weekly bars from the provider carry small inconsistencies
    /// that are tolerated rather than rejected.
    pub const fn strict_ohlc(self) -> bool {
        !matches!(self, Self::OneDay | Self::OneWeek)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "30m" => Ok(Self::ThirtyMinutes),
            "1h" => Ok(Self::OneHour),
            "1d" => Ok(Self::OneDay),
            "1wk" => Ok(Self::OneWeek),
            other => Err(ValidationError::UnknownInterval {
                value: other.to_owned(),
            }),
        }
    }
}
