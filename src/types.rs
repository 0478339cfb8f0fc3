//! Core types used throughout Arbscope
//!
//! Defines common data structures for price observations, venue identities,
//! arbitrage opportunities, and volatility reports.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of venue a price observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Centralized exchange spot quote
    CentralizedExchange,
    /// Decentralized AMM pool spot price
    DecentralizedExchangePool,
}

impl Source {
    /// Short tag used in CSV records and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::CentralizedExchange => "cex",
            Source::DecentralizedExchangePool => "dex",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cex" => Ok(Source::CentralizedExchange),
            "dex" => Ok(Source::DecentralizedExchangePool),
            other => Err(format!("unknown price source tag: {}", other)),
        }
    }
}

/// Build the venue label used for display and deterministic ordering.
///
/// A centralized exchange has no chain; a pool is qualified by its network
/// so the same token on two chains counts as two venues.
pub fn venue_label(source: Source, chain: Option<&str>) -> String {
    match source {
        Source::CentralizedExchange => source.as_str().to_string(),
        Source::DecentralizedExchangePool => {
            format!("{}:{}", source.as_str(), chain.unwrap_or("unknown"))
        }
    }
}

/// Optional market context attached to an observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMeta {
    /// 24h quote volume, when the venue reports one
    pub volume_24h: Option<Decimal>,
    /// Pool liquidity depth, when known
    pub liquidity: Option<Decimal>,
}

/// Normalized price record for one symbol at one venue at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Logical asset symbol (e.g. "WETH")
    pub symbol: String,
    /// Venue kind
    pub source: Source,
    /// Network identifier; None for centralized venues
    pub chain: Option<String>,
    /// Price of the asset in the quote stablecoin, always > 0
    pub price: Decimal,
    /// Collection-cycle timestamp (UTC), shared by all observations of a cycle
    pub observed_at: DateTime<Utc>,
    /// Optional market metadata
    pub meta: MarketMeta,
}

impl PriceObservation {
    /// Venue label for this observation
    pub fn venue(&self) -> String {
        venue_label(self.source, self.chain.as_deref())
    }
}

/// Raw centralized-exchange quote, as handed over by the collector
#[derive(Debug, Clone, PartialEq)]
pub struct CexQuote {
    pub price: Decimal,
    pub volume_24h: Option<Decimal>,
}

/// Raw decoded AMM pool quote, as handed over by the collector
#[derive(Debug, Clone, PartialEq)]
pub struct DexQuote {
    pub price: Decimal,
    pub liquidity: Option<Decimal>,
}

/// One cross-venue spread above the configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub symbol: String,
    /// Venue with the lower price
    pub buy_source: Source,
    pub buy_chain: Option<String>,
    /// Venue with the higher price
    pub sell_source: Source,
    pub sell_chain: Option<String>,
    /// Signed spread in percent: (sell - buy) / buy * 100
    pub spread_pct: Decimal,
    /// Estimated gross profit per traded unit (sell price - buy price)
    pub profit_per_unit: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    pub fn buy_venue(&self) -> String {
        venue_label(self.buy_source, self.buy_chain.as_deref())
    }

    pub fn sell_venue(&self) -> String {
        venue_label(self.sell_source, self.sell_chain.as_deref())
    }
}

impl fmt::Display for ArbitrageOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: buy {} / sell {} ({}%)",
            self.symbol,
            self.buy_venue(),
            self.sell_venue(),
            self.spread_pct.round_dp(4),
        )
    }
}

/// Summary statistics over one symbol's observation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReport {
    pub symbol: String,
    /// Number of observations in the analyzed series
    pub samples: usize,
    pub mean_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// Mean rolling standard deviation of percentage returns
    pub return_volatility_pct: f64,
    /// Mean cross-venue spread over timestamps with >= 2 venues
    pub avg_spread_pct: f64,
    /// Composite ranking score: avg spread plus return volatility
    pub opportunity_score: f64,
}
