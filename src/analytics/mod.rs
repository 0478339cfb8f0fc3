//! Offline series analytics

pub mod volatility;

pub use volatility::analyze;
