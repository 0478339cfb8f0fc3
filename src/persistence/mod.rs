//! CSV Persistence Module
//!
//! Appends price observations and arbitrage opportunities to daily CSV
//! files (one record group per UTC day) and loads observation history back
//! for offline analysis. The record field order is part of the contract
//! with downstream consumers and must not change.

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock as AsyncRwLock;
use tracing::info;

use crate::types::{ArbitrageOpportunity, MarketMeta, PriceObservation, Source};

/// Price observation record for CSV storage.
///
/// Field order is stable: symbol, source, chain, price, timestamp, then
/// optional metadata. Price keeps its exact decimal form; timestamp is
/// unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub symbol: String,
    pub source: String,
    pub chain: Option<String>,
    pub price: Decimal,
    pub timestamp: i64,
    pub volume_24h: Option<Decimal>,
    pub liquidity: Option<Decimal>,
}

/// Arbitrage opportunity record for CSV storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub symbol: String,
    pub buy_venue: String,
    pub sell_venue: String,
    pub spread_pct: Decimal,
    pub profit_per_unit: Decimal,
    pub timestamp: i64,
}

impl From<&PriceObservation> for ObservationRecord {
    fn from(obs: &PriceObservation) -> Self {
        Self {
            symbol: obs.symbol.clone(),
            source: obs.source.as_str().to_string(),
            chain: obs.chain.clone(),
            price: obs.price,
            timestamp: obs.observed_at.timestamp(),
            volume_24h: obs.meta.volume_24h,
            liquidity: obs.meta.liquidity,
        }
    }
}

impl TryFrom<ObservationRecord> for PriceObservation {
    type Error = anyhow::Error;

    fn try_from(record: ObservationRecord) -> Result<Self> {
        let source: Source = record
            .source
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let observed_at = Utc
            .timestamp_opt(record.timestamp, 0)
            .single()
            .with_context(|| format!("bad timestamp in record: {}", record.timestamp))?;
        Ok(Self {
            symbol: record.symbol,
            source,
            chain: record.chain,
            price: record.price,
            observed_at,
            meta: MarketMeta {
                volume_24h: record.volume_24h,
                liquidity: record.liquidity,
            },
        })
    }
}

impl From<&ArbitrageOpportunity> for OpportunityRecord {
    fn from(opp: &ArbitrageOpportunity) -> Self {
        Self {
            symbol: opp.symbol.clone(),
            buy_venue: opp.buy_venue(),
            sell_venue: opp.sell_venue(),
            spread_pct: opp.spread_pct,
            profit_per_unit: opp.profit_per_unit,
            timestamp: opp.observed_at.timestamp(),
        }
    }
}

/// Appending CSV writer bound to one UTC day; rolls to a fresh file when
/// the day changes so files stay partitioned by calendar date.
struct DailyWriter {
    dir: PathBuf,
    prefix: &'static str,
    day: NaiveDate,
    writer: csv::Writer<std::fs::File>,
}

impl DailyWriter {
    fn open(dir: &Path, prefix: &'static str, day: NaiveDate) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let writer = Self::create_writer(dir, &format!("{}_{}.csv", prefix, day.format("%Y-%m-%d")))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix,
            day,
            writer,
        })
    }

    fn create_writer(dir: &Path, filename: &str) -> Result<csv::Writer<std::fs::File>> {
        let path = dir.join(filename);
        let file_has_data =
            path.exists() && fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open CSV file")?;

        let writer = WriterBuilder::new()
            .has_headers(!file_has_data)
            .from_writer(file);

        Ok(writer)
    }

    fn append<T: Serialize>(&mut self, day: NaiveDate, record: &T) -> Result<()> {
        if day != self.day {
            *self = Self::open(&self.dir, self.prefix, day)?;
        }
        self.writer.serialize(record).context("Failed to write record")?;
        self.writer.flush().context("Failed to flush writer")?;
        Ok(())
    }
}

/// CSV persistence manager
pub struct CsvStore {
    data_dir: PathBuf,
    observations: AsyncRwLock<DailyWriter>,
    opportunities: AsyncRwLock<DailyWriter>,
}

impl CsvStore {
    /// Create a new CSV store rooted at `data_dir`
    pub fn new(data_dir: &str) -> Result<Self> {
        let data_dir = PathBuf::from(data_dir);
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let today = Utc::now().date_naive();
        let observations =
            DailyWriter::open(&data_dir.join("observations"), "observations", today)?;
        let opportunities =
            DailyWriter::open(&data_dir.join("opportunities"), "opportunities", today)?;

        Ok(Self {
            data_dir,
            observations: AsyncRwLock::new(observations),
            opportunities: AsyncRwLock::new(opportunities),
        })
    }

    /// Append one price observation
    pub async fn save_observation(&self, obs: &PriceObservation) -> Result<()> {
        let record = ObservationRecord::from(obs);
        let mut writer = self.observations.write().await;
        writer.append(Utc::now().date_naive(), &record)
    }

    /// Append one arbitrage opportunity
    pub async fn save_opportunity(&self, opp: &ArbitrageOpportunity) -> Result<()> {
        let record = OpportunityRecord::from(opp);
        let mut writer = self.opportunities.write().await;
        writer.append(Utc::now().date_naive(), &record)
    }

    /// Load one symbol's observation history from the last `days` daily
    /// files, sorted ascending by timestamp.
    pub fn load_observation_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PriceObservation>> {
        let mut observations = Vec::new();

        for i in 0..days {
            let date = Utc::now() - chrono::Duration::days(i as i64);
            let filename = format!("observations_{}.csv", date.format("%Y-%m-%d"));
            let path = self.data_dir.join("observations").join(&filename);

            if !path.exists() {
                continue;
            }

            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

            for result in reader.deserialize() {
                let record: ObservationRecord =
                    result.context("Failed to deserialize observation record")?;
                if record.symbol == symbol {
                    observations.push(PriceObservation::try_from(record)?);
                }
            }
        }

        observations.sort_by_key(|o| o.observed_at);
        info!(
            symbol,
            days,
            loaded = observations.len(),
            "loaded observation history"
        );
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_data_dir(test_name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "arbscope_persistence_{}_{}",
            test_name,
            uuid::Uuid::new_v4()
        ))
    }

    fn sample_observation(symbol: &str, price: Decimal) -> PriceObservation {
        PriceObservation {
            symbol: symbol.to_string(),
            source: Source::DecentralizedExchangePool,
            chain: Some("arbitrum".to_string()),
            price,
            observed_at: Utc.timestamp_opt(1_772_000_000, 0).unwrap(),
            meta: MarketMeta {
                volume_24h: None,
                liquidity: Some(dec!(123456.789)),
            },
        }
    }

    #[test]
    fn record_round_trip_preserves_all_fields() {
        let obs = sample_observation("WETH", dec!(2501.123456789012345678));
        let record = ObservationRecord::from(&obs);
        let back = PriceObservation::try_from(record).unwrap();

        assert_eq!(back.symbol, obs.symbol);
        assert_eq!(back.source, obs.source);
        assert_eq!(back.chain, obs.chain);
        assert_eq!(back.price, obs.price);
        assert_eq!(back.observed_at, obs.observed_at);
        assert_eq!(back.meta, obs.meta);
    }

    #[test]
    fn csv_round_trip_preserves_exact_decimal_and_second_timestamp() {
        let obs = sample_observation("PEPE", dec!(0.000012345678));
        let record = ObservationRecord::from(&obs);

        let mut writer = WriterBuilder::new().has_headers(true).from_writer(vec![]);
        writer.serialize(&record).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());
        let parsed: ObservationRecord = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(parsed, record);
        let back = PriceObservation::try_from(parsed).unwrap();
        assert_eq!(back.price, dec!(0.000012345678));
        assert_eq!(back.observed_at.timestamp(), obs.observed_at.timestamp());
    }

    #[test]
    fn record_header_keeps_contract_field_order() {
        let obs = sample_observation("WETH", dec!(1));
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(vec![]);
        writer.serialize(ObservationRecord::from(&obs)).unwrap();
        let bytes = writer.into_inner().unwrap();
        let content = String::from_utf8(bytes).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "symbol,source,chain,price,timestamp,volume_24h,liquidity"
        );
    }

    #[test]
    fn store_saves_and_loads_history() {
        let dir = temp_data_dir("save_load");
        let store = CsvStore::new(dir.to_str().unwrap()).unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut obs = sample_observation("LINK", dec!(14.25));
            obs.observed_at = Utc::now() - chrono::Duration::seconds(60);
            store.save_observation(&obs).await.unwrap();

            let mut later = sample_observation("LINK", dec!(14.50));
            later.observed_at = Utc::now();
            store.save_observation(&later).await.unwrap();

            let other = sample_observation("WETH", dec!(2500));
            store.save_observation(&other).await.unwrap();
        });

        let history = store.load_observation_history("LINK", 2).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].observed_at <= history[1].observed_at);
        assert_eq!(history[0].price, dec!(14.25));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn daily_writer_rolls_to_new_file_on_day_change() {
        let dir = temp_data_dir("rotation");
        fs::create_dir_all(&dir).unwrap();
        let day1 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let obs = sample_observation("WETH", dec!(2500));
        let record = ObservationRecord::from(&obs);

        let mut writer = DailyWriter::open(&dir, "observations", day1).unwrap();
        writer.append(day1, &record).unwrap();
        writer.append(day2, &record).unwrap();

        assert!(dir.join("observations_2026-03-01.csv").exists());
        assert!(dir.join("observations_2026-03-02.csv").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn writer_adds_headers_only_for_empty_files() {
        let dir = temp_data_dir("headers");
        fs::create_dir_all(&dir).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let record = ObservationRecord::from(&sample_observation("WETH", dec!(1)));

        let mut writer = DailyWriter::open(&dir, "observations", day).unwrap();
        writer.append(day, &record).unwrap();
        drop(writer);

        // Reopening an existing non-empty file must not duplicate the header
        let mut writer = DailyWriter::open(&dir, "observations", day).unwrap();
        writer.append(day, &record).unwrap();
        drop(writer);

        let content = fs::read_to_string(dir.join("observations_2026-03-01.csv")).unwrap();
        let header_lines = content
            .lines()
            .filter(|line| line.starts_with("symbol,"))
            .count();
        assert_eq!(header_lines, 1);
        assert_eq!(content.lines().count(), 3);

        let _ = fs::remove_dir_all(&dir);
    }
}
