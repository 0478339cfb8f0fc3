//! Application wiring: gather-then-compute collection cycles
//!
//! One cycle fetches every venue concurrently (each request under its own
//! timeout), then runs the pure pricing core synchronously over whatever
//! arrived. A venue that failed or timed out contributes nothing; the cycle
//! never blocks on a straggler past the configured deadline.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::analytics::analyze;
use crate::arbitrage::score;
use crate::collector::{CexClient, PoolReader};
use crate::config::AppConfig;
use crate::errors::AnalyticsError;
use crate::persistence::CsvStore;
use crate::pricing::normalize;
use crate::types::{CexQuote, DexQuote, VolatilityReport};

pub struct App {
    config: AppConfig,
    cex: Option<CexClient>,
    pools: PoolReader,
    store: Option<CsvStore>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let cex = if config.collector.cex_enabled {
            Some(CexClient::new(&config.collector)?)
        } else {
            None
        };
        let pools = PoolReader::new(&config.chains)?;
        let store = if config.persistence.csv_enabled {
            Some(CsvStore::new(&config.persistence.data_dir)?)
        } else {
            None
        };
        Ok(Self {
            config,
            cex,
            pools,
            store,
        })
    }

    /// Run one collection cycle: gather, normalize, score, persist
    pub async fn run_once(&self) -> Result<()> {
        let started = std::time::Instant::now();
        let (cex_quotes, dex_quotes) = tokio::join!(self.gather_cex(), self.gather_dex());
        let observed_at = Utc::now();

        let mut total_observations = 0usize;
        let mut total_opportunities = 0usize;

        for token in &self.config.tokens {
            let per_chain: Vec<(String, Option<DexQuote>)> = self
                .config
                .chains
                .iter()
                .map(|chain| {
                    let quote = dex_quotes
                        .get(&(token.symbol.clone(), chain.name.clone()))
                        .cloned()
                        .flatten();
                    (chain.name.clone(), quote)
                })
                .collect();

            let observations = normalize(
                &token.symbol,
                cex_quotes.get(&token.symbol),
                &per_chain,
                observed_at,
            );
            if observations.is_empty() {
                warn!(symbol = %token.symbol, "no venue produced a price this cycle");
                continue;
            }
            total_observations += observations.len();

            if let Some(store) = &self.store {
                for obs in &observations {
                    store.save_observation(obs).await?;
                }
            }

            let opportunities = score(&observations, self.config.arbitrage.min_spread_pct)
                .with_context(|| format!("scoring failed for {}", token.symbol))?;
            for opp in &opportunities {
                info!(opportunity = %opp, "spread above threshold");
                if let Some(store) = &self.store {
                    store.save_opportunity(opp).await?;
                }
            }
            total_opportunities += opportunities.len();
        }

        info!(
            observations = total_observations,
            opportunities = total_opportunities,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection cycle complete"
        );
        Ok(())
    }

    /// Run cycles forever at the given interval until ctrl-c
    pub async fn run_continuous(&self, interval: Duration) -> Result<()> {
        info!(interval_secs = interval.as_secs(), "starting continuous collection");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "collection cycle failed");
                    }
                }
            }
        }
        Ok(())
    }

    /// Analyze persisted history and rank symbols by opportunity score
    pub fn analyze_history(&self, days: u32, window_size: usize) -> Result<Vec<VolatilityReport>> {
        let Some(store) = &self.store else {
            bail!("CSV persistence is disabled; nothing to analyze");
        };

        let mut reports = Vec::new();
        for token in &self.config.tokens {
            let series = store.load_observation_history(&token.symbol, days)?;
            match analyze(&series, window_size) {
                Ok(report) => {
                    info!(
                        symbol = %report.symbol,
                        samples = report.samples,
                        mean = %report.mean_price,
                        volatility_pct = report.return_volatility_pct,
                        avg_spread_pct = report.avg_spread_pct,
                        score = report.opportunity_score,
                        "volatility report"
                    );
                    reports.push(report);
                }
                Err(AnalyticsError::InsufficientData { needed, got }) => {
                    info!(symbol = %token.symbol, needed, got, "not enough data to analyze");
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("analysis failed for {}", token.symbol));
                }
            }
        }

        reports.sort_by(|a, b| {
            b.opportunity_score
                .partial_cmp(&a.opportunity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(reports)
    }

    async fn gather_cex(&self) -> HashMap<String, CexQuote> {
        let Some(cex) = &self.cex else {
            return HashMap::new();
        };
        match cex.fetch_quotes(&self.config.tokens).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(error = %e, "CEX quotes unavailable this cycle");
                HashMap::new()
            }
        }
    }

    /// Fan out one pool read per (token, chain) pair, each under its own
    /// timeout; a timeout or RPC error degrades to an absent quote.
    async fn gather_dex(&self) -> HashMap<(String, String), Option<DexQuote>> {
        let timeout = Duration::from_millis(self.config.collector.request_timeout_ms);
        let mut tasks = Vec::new();
        for token in &self.config.tokens {
            for chain in &self.config.chains {
                tasks.push(async move {
                    let quote =
                        match tokio::time::timeout(timeout, self.pools.fetch_quote(&chain.name, token))
                            .await
                        {
                            Ok(Ok(quote)) => quote,
                            Ok(Err(e)) => {
                                warn!(symbol = %token.symbol, chain = %chain.name, error = %e, "pool read failed");
                                None
                            }
                            Err(_) => {
                                warn!(symbol = %token.symbol, chain = %chain.name, "pool read timed out");
                                None
                            }
                        };
                    ((token.symbol.clone(), chain.name.clone()), quote)
                });
            }
        }
        join_all(tasks).await.into_iter().collect()
    }
}
