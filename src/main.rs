//! Arbscope entrypoint
//!
//! Usage: arbscope [INTERVAL_SECS | analyze [DAYS [WINDOW]]]
//! With no arguments, runs a single collection cycle.

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arbscope::app::App;
use arbscope::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    info!(config = %config, "configuration loaded");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let app = App::new(config.clone())?;

    match args.first().map(String::as_str) {
        None => app.run_once().await,
        Some("analyze") => {
            let days = args
                .get(1)
                .map(|s| s.parse::<u32>())
                .transpose()?
                .unwrap_or(config.analytics.history_days);
            let window = args
                .get(2)
                .map(|s| s.parse::<usize>())
                .transpose()?
                .unwrap_or(config.analytics.window_size);
            let reports = app.analyze_history(days, window)?;
            info!(reports = reports.len(), "analysis complete");
            Ok(())
        }
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => app.run_continuous(Duration::from_secs(secs)).await,
            _ => bail!("usage: arbscope [INTERVAL_SECS | analyze [DAYS [WINDOW]]]"),
        },
    }
}
