//! Centralized-exchange spot quotes over REST
//!
//! One bulk ticker request per collection cycle covers every configured
//! token; rows are mapped back to symbols through each token's exchange
//! pair. Transient failures (timeouts, HTTP 429) retry with exponential
//! backoff before the cycle proceeds without a CEX quote.

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{CollectorConfig, TokenConfig};
use crate::types::CexQuote;

/// Row of the Binance `GET /api/v3/ticker/24hr` bulk response
#[derive(Debug, Deserialize)]
struct TickerRow {
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "quoteVolume")]
    quote_volume: String,
}

/// REST client for the centralized-exchange price feed
pub struct CexClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: usize,
    backoff: Duration,
}

impl CexClient {
    pub fn new(cfg: &CollectorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.cex_url.trim_end_matches('/').to_string(),
            max_retries: cfg.max_retries.max(1),
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
        })
    }

    /// Fetch last price and 24h quote volume for every configured token.
    ///
    /// Tokens whose pair is missing from the response, or whose price fails
    /// to parse as a positive decimal, are simply absent from the result.
    pub async fn fetch_quotes(&self, tokens: &[TokenConfig]) -> Result<HashMap<String, CexQuote>> {
        let pair_to_symbol: HashMap<&str, &str> = tokens
            .iter()
            .map(|t| (t.exchange_pair.as_str(), t.symbol.as_str()))
            .collect();

        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let wait = self.backoff * 2u32.pow(attempt as u32 - 1);
                debug!(attempt, wait_ms = wait.as_millis() as u64, "retrying CEX fetch");
                tokio::time::sleep(wait).await;
            }
            match self.try_fetch(&url).await {
                Ok(rows) => {
                    let quotes = map_quotes(rows, &pair_to_symbol);
                    debug!(quotes = quotes.len(), "CEX bulk fetch complete");
                    return Ok(quotes);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "CEX fetch failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("CEX fetch failed with no attempts")))
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<TickerRow>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("CEX ticker request failed")?;

        if response.status().as_u16() == 429 {
            bail!("CEX rate limit hit");
        }
        if !response.status().is_success() {
            bail!("CEX API returned error: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse CEX ticker response")
    }
}

fn map_quotes(
    rows: Vec<TickerRow>,
    pair_to_symbol: &HashMap<&str, &str>,
) -> HashMap<String, CexQuote> {
    let mut quotes = HashMap::new();
    for row in rows {
        let Some(symbol) = pair_to_symbol.get(row.symbol.as_str()) else {
            continue;
        };
        let Ok(price) = Decimal::from_str(&row.last_price) else {
            warn!(pair = %row.symbol, raw = %row.last_price, "unparseable CEX price");
            continue;
        };
        if price <= Decimal::ZERO {
            warn!(pair = %row.symbol, %price, "non-positive CEX price skipped");
            continue;
        }
        let volume_24h = Decimal::from_str(&row.quote_volume).ok();
        quotes.insert(
            symbol.to_string(),
            CexQuote { price, volume_24h },
        );
    }
    quotes
}
