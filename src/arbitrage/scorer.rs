//! Pairwise spread scoring over one cycle's observations
//!
//! All observations handed to [`score`] must come from a single collection
//! cycle for a single symbol; the scorer verifies that contract and treats a
//! violation as a caller bug rather than papering over it. The comparison is
//! a full O(n^2) cross product, which is fine: n is the handful of configured
//! venues, never a historical series.

use rust_decimal::Decimal;

use crate::errors::AnalyticsError;
use crate::types::{ArbitrageOpportunity, PriceObservation};

/// Compare every venue pair and keep those whose spread clears the
/// threshold.
///
/// For each ordered pair the buy side is the cheaper venue and
/// `spread = (sell - buy) / buy * 100`. Pairs from the same (source, chain)
/// venue are skipped. Output is sorted by spread descending with ties broken
/// by symbol and venue labels, so identical inputs always rank identically.
pub fn score(
    observations: &[PriceObservation],
    min_spread_pct: Decimal,
) -> Result<Vec<ArbitrageOpportunity>, AnalyticsError> {
    if observations.len() < 2 {
        return Ok(Vec::new());
    }

    let symbol = &observations[0].symbol;
    let observed_at = observations[0].observed_at;
    for obs in observations {
        if obs.symbol != *symbol {
            return Err(AnalyticsError::InvalidInput(format!(
                "mixed symbols in one scoring call: {} and {}",
                symbol, obs.symbol
            )));
        }
        if obs.observed_at != observed_at {
            return Err(AnalyticsError::InvalidInput(format!(
                "mixed timestamps in one scoring call: {} and {}",
                observed_at, obs.observed_at
            )));
        }
        if obs.price <= Decimal::ZERO {
            return Err(AnalyticsError::InvalidInput(format!(
                "non-positive price for {} at {}",
                obs.symbol,
                obs.venue()
            )));
        }
    }

    let hundred = Decimal::from(100);
    let mut opportunities = Vec::new();
    for (i, buy) in observations.iter().enumerate() {
        for (j, sell) in observations.iter().enumerate() {
            if i == j {
                continue;
            }
            if buy.source == sell.source && buy.chain == sell.chain {
                continue;
            }
            let spread_pct = (sell.price - buy.price) / buy.price * hundred;
            if spread_pct < min_spread_pct {
                continue;
            }
            opportunities.push(ArbitrageOpportunity {
                symbol: symbol.clone(),
                buy_source: buy.source,
                buy_chain: buy.chain.clone(),
                sell_source: sell.source,
                sell_chain: sell.chain.clone(),
                spread_pct,
                profit_per_unit: sell.price - buy.price,
                observed_at,
            });
        }
    }

    opportunities.sort_by(|a, b| {
        b.spread_pct
            .cmp(&a.spread_pct)
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then_with(|| a.buy_venue().cmp(&b.buy_venue()))
            .then_with(|| a.sell_venue().cmp(&b.sell_venue()))
    });

    Ok(opportunities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketMeta, Source};
    use chrono::{DateTime, Utc};
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal_macros::dec;

    fn obs(
        symbol: &str,
        source: Source,
        chain: Option<&str>,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> PriceObservation {
        PriceObservation {
            symbol: symbol.to_string(),
            source,
            chain: chain.map(str::to_string),
            price,
            observed_at: at,
            meta: MarketMeta::default(),
        }
    }

    #[test]
    fn two_venue_spread_matches_hand_computation() {
        let at = Utc::now();
        let observations = vec![
            obs("WETH", Source::CentralizedExchange, None, dec!(100), at),
            obs(
                "WETH",
                Source::DecentralizedExchangePool,
                Some("ethereum"),
                dec!(105),
                at,
            ),
        ];

        let opportunities = score(&observations, dec!(2)).unwrap();

        assert_eq!(opportunities.len(), 1);
        let opp = &opportunities[0];
        let spread = opp.spread_pct.to_f64().unwrap();
        assert!((spread - 5.0).abs() < 1e-9);
        assert_eq!(opp.buy_source, Source::CentralizedExchange);
        assert_eq!(opp.sell_chain.as_deref(), Some("ethereum"));
        assert_eq!(opp.profit_per_unit, dec!(5));
    }

    #[test]
    fn equal_prices_yield_nothing_for_positive_threshold() {
        let at = Utc::now();
        let observations = vec![
            obs("LINK", Source::CentralizedExchange, None, dec!(100), at),
            obs(
                "LINK",
                Source::DecentralizedExchangePool,
                Some("ethereum"),
                dec!(100),
                at,
            ),
            obs(
                "LINK",
                Source::DecentralizedExchangePool,
                Some("base"),
                dec!(100),
                at,
            ),
        ];

        assert!(score(&observations, dec!(0.01)).unwrap().is_empty());
    }

    #[test]
    fn no_result_falls_below_the_threshold_and_order_is_non_increasing() {
        let at = Utc::now();
        let observations = vec![
            obs("UNI", Source::CentralizedExchange, None, dec!(10), at),
            obs(
                "UNI",
                Source::DecentralizedExchangePool,
                Some("ethereum"),
                dec!(10.5),
                at,
            ),
            obs(
                "UNI",
                Source::DecentralizedExchangePool,
                Some("arbitrum"),
                dec!(10.2),
                at,
            ),
            obs(
                "UNI",
                Source::DecentralizedExchangePool,
                Some("base"),
                dec!(9.9),
                at,
            ),
        ];
        let min = dec!(0.5);

        let opportunities = score(&observations, min).unwrap();

        assert!(!opportunities.is_empty());
        for opp in &opportunities {
            assert!(opp.spread_pct >= min);
        }
        for pair in opportunities.windows(2) {
            assert!(pair[0].spread_pct >= pair[1].spread_pct);
        }
    }

    #[test]
    fn mixed_symbols_are_a_caller_bug() {
        let at = Utc::now();
        let observations = vec![
            obs("WETH", Source::CentralizedExchange, None, dec!(100), at),
            obs(
                "WBTC",
                Source::DecentralizedExchangePool,
                Some("ethereum"),
                dec!(105),
                at,
            ),
        ];

        assert!(matches!(
            score(&observations, dec!(1)),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn mixed_timestamps_are_a_caller_bug() {
        let at = Utc::now();
        let later = at + chrono::Duration::seconds(30);
        let observations = vec![
            obs("WETH", Source::CentralizedExchange, None, dec!(100), at),
            obs(
                "WETH",
                Source::DecentralizedExchangePool,
                Some("ethereum"),
                dec!(105),
                later,
            ),
        ];

        assert!(matches!(
            score(&observations, dec!(1)),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn fewer_than_two_observations_score_empty() {
        let at = Utc::now();
        let single = vec![obs("WETH", Source::CentralizedExchange, None, dec!(100), at)];
        assert!(score(&single, dec!(0.1)).unwrap().is_empty());
        assert!(score(&[], dec!(0.1)).unwrap().is_empty());
    }

    #[test]
    fn tie_breaking_is_lexicographic_over_venues() {
        let at = Utc::now();
        // Two pools at the same low price against one expensive pool: the two
        // resulting opportunities tie on spread and must sort by venue label.
        let observations = vec![
            obs(
                "OP",
                Source::DecentralizedExchangePool,
                Some("base"),
                dec!(2),
                at,
            ),
            obs(
                "OP",
                Source::DecentralizedExchangePool,
                Some("arbitrum"),
                dec!(2),
                at,
            ),
            obs(
                "OP",
                Source::DecentralizedExchangePool,
                Some("ethereum"),
                dec!(2.2),
                at,
            ),
        ];

        let opportunities = score(&observations, dec!(5)).unwrap();
        assert_eq!(opportunities.len(), 2);
        assert_eq!(opportunities[0].buy_venue(), "dex:arbitrum");
        assert_eq!(opportunities[1].buy_venue(), "dex:base");
    }
}
