//! Historical volatility and opportunity scoring for one symbol
//!
//! Works over a time-ordered observation series loaded from the record
//! store. Return volatility is the mean of rolling standard deviations of
//! percentage returns; the cross-venue component averages the per-timestamp
//! spread wherever at least two venues reported in the same cycle. Higher
//! volatility and wider historical spreads both raise the composite score.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::AnalyticsError;
use crate::types::{PriceObservation, VolatilityReport};

/// Analyze an ascending, single-symbol observation series.
///
/// Fails with [`AnalyticsError::InsufficientData`] on fewer than 2 points
/// and with [`AnalyticsError::InvalidInput`] when the series is unordered,
/// mixes symbols, or `window_size` is zero. The input is never mutated.
pub fn analyze(
    series: &[PriceObservation],
    window_size: usize,
) -> Result<VolatilityReport, AnalyticsError> {
    if window_size == 0 {
        return Err(AnalyticsError::InvalidInput(
            "window size must be positive".to_string(),
        ));
    }
    if series.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            needed: 2,
            got: series.len(),
        });
    }

    let symbol = &series[0].symbol;
    for pair in series.windows(2) {
        if pair[1].symbol != *symbol {
            return Err(AnalyticsError::InvalidInput(format!(
                "mixed symbols in series: {} and {}",
                symbol, pair[1].symbol
            )));
        }
        if pair[1].observed_at < pair[0].observed_at {
            return Err(AnalyticsError::InvalidInput(
                "series is not ordered by time".to_string(),
            ));
        }
    }
    if let Some(bad) = series.iter().find(|o| o.price <= Decimal::ZERO) {
        return Err(AnalyticsError::InvalidInput(format!(
            "non-positive price in series at {}",
            bad.observed_at
        )));
    }

    let mut min_price = series[0].price;
    let mut max_price = series[0].price;
    let mut sum = Decimal::ZERO;
    for obs in series {
        min_price = min_price.min(obs.price);
        max_price = max_price.max(obs.price);
        sum += obs.price;
    }
    let mean_price = sum / Decimal::from(series.len() as u64);

    let returns = pct_returns(series);
    let return_volatility_pct = rolling_volatility(&returns, window_size);
    let avg_spread_pct = avg_cross_venue_spread(series);
    let opportunity_score = avg_spread_pct + return_volatility_pct;

    Ok(VolatilityReport {
        symbol: symbol.clone(),
        samples: series.len(),
        mean_price,
        min_price,
        max_price,
        return_volatility_pct,
        avg_spread_pct,
        opportunity_score,
    })
}

/// Percentage returns between consecutive observations
fn pct_returns(series: &[PriceObservation]) -> Vec<f64> {
    series
        .windows(2)
        .map(|pair| {
            let delta = (pair[1].price - pair[0].price) / pair[0].price * Decimal::from(100);
            delta.to_f64().unwrap_or(0.0)
        })
        .collect()
}

/// Mean of standard deviations over sliding `window_size`-point windows.
/// With fewer returns than the window, one window spans them all.
fn rolling_volatility(returns: &[f64], window_size: usize) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    if returns.len() <= window_size {
        return std_dev(returns);
    }
    let stds: Vec<f64> = returns.windows(window_size).map(std_dev).collect();
    stds.iter().sum::<f64>() / stds.len() as f64
}

fn std_dev(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

/// Average (max - min) / min spread across timestamps that carry at least
/// two venues; 0 for a single-venue series.
fn avg_cross_venue_spread(series: &[PriceObservation]) -> f64 {
    let mut spreads = Vec::new();
    let mut start = 0;
    while start < series.len() {
        let at = series[start].observed_at;
        let mut end = start + 1;
        while end < series.len() && series[end].observed_at == at {
            end += 1;
        }
        let group = &series[start..end];
        if group.len() >= 2 {
            let mut min = group[0].price;
            let mut max = group[0].price;
            for obs in group {
                min = min.min(obs.price);
                max = max.max(obs.price);
            }
            let spread = (max - min) / min * Decimal::from(100);
            spreads.push(spread.to_f64().unwrap_or(0.0));
        }
        start = end;
    }
    if spreads.is_empty() {
        0.0
    } else {
        spreads.iter().sum::<f64>() / spreads.len() as f64
    }
}
