//! Typed error taxonomy for the pricing core
//!
//! Collector and application layers wrap these in `anyhow` with context;
//! the core itself never swallows an error into a fabricated price.

use thiserror::Error;

/// Failure to turn raw on-chain pool state into a price.
///
/// Always recoverable: the caller skips the observation for this cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("pool sqrt price is zero")]
    ZeroSqrtPrice,

    #[error("token decimals out of range: {0}")]
    DecimalsOutOfRange(u8),

    #[error("decoded price outside plausible range")]
    PriceOutOfRange,
}

/// Contract violations and data shortfalls in the scorer and analyzer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// Caller bug (mixed symbols, mixed timestamps, unsorted series);
    /// must propagate and abort the cycle's scoring/analysis step.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Not enough history to analyze; caller reports "not enough data".
    #[error("insufficient data: need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },
}
