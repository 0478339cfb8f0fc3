//! Merges per-venue quotes into time-aligned price observations
//!
//! One collection cycle hands over whatever the collectors managed to fetch:
//! an optional CEX quote and one optional decoded pool quote per chain.
//! Normalization is a pure function of those inputs; a fetch or decode
//! failure upstream arrives here as `None` and simply yields no observation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use crate::types::{CexQuote, DexQuote, MarketMeta, PriceObservation, Source};

/// Produce one observation per present input, all sharing `observed_at`.
///
/// Output order is deterministic: the centralized quote first, then chains in
/// the order given (callers pass chains in configuration order), so
/// downstream comparison and persistence are reproducible. Absent inputs are
/// omitted; nothing is ever fabricated in their place.
pub fn normalize(
    symbol: &str,
    cex: Option<&CexQuote>,
    dex: &[(String, Option<DexQuote>)],
    observed_at: DateTime<Utc>,
) -> Vec<PriceObservation> {
    let mut observations = Vec::with_capacity(dex.len() + 1);

    if let Some(quote) = cex {
        if quote.price > Decimal::ZERO {
            observations.push(PriceObservation {
                symbol: symbol.to_string(),
                source: Source::CentralizedExchange,
                chain: None,
                price: quote.price,
                observed_at,
                meta: MarketMeta {
                    volume_24h: quote.volume_24h,
                    liquidity: None,
                },
            });
        } else {
            warn!(symbol, price = %quote.price, "dropping non-positive CEX quote");
        }
    }

    for (chain, quote) in dex {
        let Some(quote) = quote else { continue };
        if quote.price <= Decimal::ZERO {
            warn!(symbol, chain = %chain, price = %quote.price, "dropping non-positive pool quote");
            continue;
        }
        observations.push(PriceObservation {
            symbol: symbol.to_string(),
            source: Source::DecentralizedExchangePool,
            chain: Some(chain.clone()),
            price: quote.price,
            observed_at,
            meta: MarketMeta {
                volume_24h: None,
                liquidity: quote.liquidity,
            },
        });
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn dex_input(pairs: &[(&str, Option<Decimal>)]) -> Vec<(String, Option<DexQuote>)> {
        pairs
            .iter()
            .map(|(chain, price)| {
                (
                    chain.to_string(),
                    price.map(|price| DexQuote {
                        price,
                        liquidity: None,
                    }),
                )
            })
            .collect()
    }

    #[test]
    fn emits_one_observation_per_present_input() {
        let cex = CexQuote {
            price: dec!(100),
            volume_24h: Some(dec!(1234567.89)),
        };
        let dex = dex_input(&[
            ("ethereum", Some(dec!(100.5))),
            ("arbitrum", None),
            ("base", Some(dec!(99.8))),
        ]);

        let observations = normalize("LINK", Some(&cex), &dex, Utc::now());

        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].source, Source::CentralizedExchange);
        assert_eq!(observations[0].chain, None);
        assert_eq!(observations[0].meta.volume_24h, Some(dec!(1234567.89)));
        assert_eq!(observations[1].chain.as_deref(), Some("ethereum"));
        assert_eq!(observations[2].chain.as_deref(), Some("base"));
    }

    #[test]
    fn omits_absent_inputs_without_fabricating() {
        let dex = dex_input(&[("ethereum", None), ("optimism", None)]);
        let observations = normalize("UNI", None, &dex, Utc::now());
        assert!(observations.is_empty());
    }

    #[test]
    fn all_observations_share_the_cycle_timestamp() {
        let at = Utc::now();
        let cex = CexQuote {
            price: dec!(42),
            volume_24h: None,
        };
        let dex = dex_input(&[("ethereum", Some(dec!(41.9)))]);

        let observations = normalize("AAVE", Some(&cex), &dex, at);
        assert!(observations.iter().all(|o| o.observed_at == at));
    }

    #[test]
    fn output_is_deterministic_for_identical_inputs() {
        let at = Utc::now();
        let cex = CexQuote {
            price: dec!(7.5),
            volume_24h: None,
        };
        let dex = dex_input(&[("base", Some(dec!(7.6))), ("ethereum", Some(dec!(7.4)))]);

        let first = normalize("CRV", Some(&cex), &dex, at);
        let second = normalize("CRV", Some(&cex), &dex, at);
        assert_eq!(first, second);
    }

    #[test]
    fn non_positive_prices_are_treated_as_absent() {
        let cex = CexQuote {
            price: dec!(0),
            volume_24h: None,
        };
        let dex = dex_input(&[("ethereum", Some(dec!(-1)))]);
        let observations = normalize("DOGE", Some(&cex), &dex, Utc::now());
        assert!(observations.is_empty());
    }
}
