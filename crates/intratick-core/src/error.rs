//! Error types shared across the core crate.

use thiserror::Error;

use crate::{Interval, Symbol};

/// Construction-time validation failure for domain types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("symbol is {len} characters, maximum is {max}")]
    SymbolTooLong { len: usize, max: usize },

    #[error("symbol must start with an ASCII letter, got '{ch}'")]
    SymbolInvalidStart { ch: char },

    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("unknown interval '{value}'")]
    UnknownInterval { value: String },

    #[error("{field} must be a finite number")]
    NonFiniteValue { field: &'static str },

    #[error("{field} must not be negative")]
    NegativeValue { field: &'static str },

    #[error("bar high is below bar low")]
    InvalidBarRange,

    #[error("bar timestamps must be strictly increasing")]
    NonMonotonicSeries,
}

/// Caller-facing acquisition failure.
///
/// Everything that can go wrong inside a fetch (transport errors, malformed
/// responses, validation rejections) is folded into the retry/fallback loop;
/// only these two outcomes escape to callers. Neither is fatal to the
/// process: the fetcher's cache, fallback map, and rate-limiter state all
/// survive a failed request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// All attempts failed and no fallback series was available.
    #[error("no data available for {symbol} {interval}: {reason}")]
    DataUnavailable {
        symbol: Symbol,
        interval: Interval,
        reason: String,
    },

    /// Malformed symbol or parameters, rejected before any I/O.
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
}

impl FetchError {
    /// True when the caller may reasonably retry the same request later.
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. })
    }
}
