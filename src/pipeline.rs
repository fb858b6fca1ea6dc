//! Dashboard stages
//!
//! `fetch` talks to Trading 212 and fills the cache. The generate stages only
//! read cached history (and, for top dividends, the inventory artifact), so
//! they can be rerun offline.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::aggregate::{
    build_inventory, dividend_stats, monthly_rollup, total_invested, DividendStats, Inventory,
    MonthlyRollup, YieldMemo,
};
use crate::cache::Cache;
use crate::config::Config;
use crate::error::PipelineError;
use crate::providers::{http_client, YieldChain};
use crate::trading212::models::{dividends_to_transactions, orders_to_transactions};
use crate::trading212::{cached_history, store_history, HistoryKind, Session, Trading212Client};

pub const INVENTORY_FILE: &str = "inventory.json";
pub const MONTHLY_FILE: &str = "monthly.json";
pub const TOP_DIVIDENDS_FILE: &str = "top-dividends.json";

pub struct Pipeline {
    config: Config,
    cache: Arc<Cache>,
    http: Client,
}

impl Pipeline {
    /// Pipeline over the on-disk cache at `config.cache_root()`.
    pub fn new(config: Config) -> Result<Self> {
        let root = config.cache_root()?;
        info!("Using cache at {}", root.display());
        Self::with_cache(config, Arc::new(Cache::on_disk(root)))
    }

    pub fn with_cache(config: Config, cache: Arc<Cache>) -> Result<Self> {
        let http = http_client(config.http_timeout_secs)?;
        Ok(Self {
            config,
            cache,
            http,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.config.output_dir.join(filename)
    }

    /// Download the full order and dividend history into the cache.
    pub async fn fetch_history(&self) -> Result<()> {
        if self.config.offline {
            return Err(PipelineError::Offline {
                provider: "trading212".to_string(),
                resource: "history".to_string(),
            }
            .into());
        }
        let session = Session::from_cookie_header(self.config.cookie()?)?;
        let client = Trading212Client::new(
            self.http.clone(),
            &self.config.trading212.base_url,
            session,
            self.config.trading212.max_pages,
        );

        for kind in [HistoryKind::Orders, HistoryKind::Dividends] {
            let entries = client.fetch_history(kind).await?;
            store_history(&self.cache, kind, &entries)?;
        }
        Ok(())
    }

    pub async fn generate_inventory(&self) -> Result<Inventory> {
        let entries = cached_history(&self.cache, HistoryKind::Orders)?;
        let mut orders = orders_to_transactions(&entries)?;
        // History is newest first; positions must be folded oldest first.
        orders.reverse();
        orders.sort_by_key(|tx| tx.date);

        let yields = YieldChain::from_config(&self.config, &self.http, self.cache.clone());
        let mut memo = YieldMemo::new();
        let inventory = build_inventory(&orders, &yields, &mut memo).await?;

        self.write_artifact(INVENTORY_FILE, &inventory)?;
        info!(
            "Inventory holds {} instruments, {} invested",
            inventory.len(),
            total_invested(&inventory)
        );
        Ok(inventory)
    }

    pub fn generate_monthly(&self) -> Result<Vec<MonthlyRollup>> {
        let entries = cached_history(&self.cache, HistoryKind::Dividends)?;
        let dividends = dividends_to_transactions(&entries)?;
        let rollup = monthly_rollup(&dividends);

        self.write_artifact(MONTHLY_FILE, &rollup)?;
        info!("Monthly rollup covers {} months", rollup.len());
        Ok(rollup)
    }

    /// Needs `inventory.json` from a previous inventory stage.
    pub fn generate_top_dividends(&self) -> Result<DividendStats> {
        let inventory: Inventory = self
            .read_artifact(INVENTORY_FILE)
            .context("Run the inventory stage first")?;
        let entries = cached_history(&self.cache, HistoryKind::Dividends)?;
        let dividends = dividends_to_transactions(&entries)?;
        let stats = dividend_stats(&dividends, &inventory)?;

        self.write_artifact(TOP_DIVIDENDS_FILE, &stats)?;
        info!("Dividend stats for {} instruments", stats.len());
        Ok(stats)
    }

    /// Expired entries removed from `namespace`.
    pub fn prune(&self, namespace: &str) -> Result<usize> {
        self.cache.prune(namespace)
    }

    fn write_artifact<T: Serialize + ?Sized>(&self, filename: &str, value: &T) -> Result<()> {
        let path = self.artifact_path(filename);
        std::fs::create_dir_all(self.output_dir()).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir().display())
        })?;
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to encode {}", filename))?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    fn read_artifact<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        let path = self.artifact_path(filename);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, PurgePolicy};
    use crate::config::YieldSourceKind;
    use crate::trading212::HistoryEntry;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tempfile::TempDir;

    fn order(instrument: &str, side: &str, quantity: f64, amount: f64, date: &str) -> serde_json::Value {
        json!({
            "additionalInfo": { "key": "history.order.status.filled" },
            "date": date,
            "heading": {
                "key": "history.instrument",
                "context": { "instrument": instrument, "prettyName": format!("{} plc", instrument) }
            },
            "mainInfo": { "key": "history.currency-amount", "context": { "amount": amount } },
            "subHeading": {
                "key": format!("history.order.filled.{}", side),
                "context": { "quantity": quantity, "quantityPrecision": 8 }
            }
        })
    }

    fn dividend(instrument: &str, amount: f64, date: &str) -> serde_json::Value {
        json!({
            "date": date,
            "heading": { "key": "history.dividend" },
            "mainInfo": { "key": "history.currency-amount", "context": { "amount": amount } },
            "subHeading": {
                "key": "history.instrument",
                "context": { "instrument": instrument, "prettyName": format!("{} plc", instrument) }
            }
        })
    }

    fn seed(cache: &Cache, kind: HistoryKind, entries: Vec<serde_json::Value>) {
        let entries: Vec<HistoryEntry> = entries
            .into_iter()
            .map(|value| serde_json::from_value(value).unwrap())
            .collect();
        store_history(cache, kind, &entries).unwrap();
    }

    fn pipeline(output: &TempDir) -> (Pipeline, Arc<Cache>) {
        let config = Config {
            output_dir: output.path().join("dashboard"),
            offline: true,
            yield_sources: vec![YieldSourceKind::StockBot],
            ..Config::default()
        };
        let cache = Arc::new(Cache::in_memory());
        (Pipeline::with_cache(config, cache.clone()).unwrap(), cache)
    }

    #[tokio::test]
    async fn test_generate_all_stages() {
        let output = TempDir::new().unwrap();
        let (pipeline, cache) = pipeline(&output);

        // newest first, as fetched
        seed(
            &cache,
            HistoryKind::Orders,
            vec![
                order("VOD", "sell", 5.0, 6.0, "2021-03-01T10:00:00+00:00"),
                order("GSK", "sell", 4.0, 44.0, "2021-02-04T10:00:00+00:00"),
                order("VOD", "buy", 5.0, 5.0, "2021-01-05T10:00:00+00:00"),
                order("GSK", "buy", 10.0, 100.0, "2021-01-04T10:00:00+00:00"),
            ],
        );
        seed(
            &cache,
            HistoryKind::Dividends,
            vec![
                dividend("GSK", 2.0, "2021-02-19T15:56:55+02:00"),
                dividend("GSK", 1.0, "2021-01-19T15:56:55+02:00"),
            ],
        );
        cache
            .write_json(
                &CacheKey::new("stock-bot", "GSK", "instrument.json"),
                &json!({ "id": "gsk-1", "symbol": "GSK" }),
                PurgePolicy::Never,
            )
            .unwrap();
        cache
            .write_json(
                &CacheKey::new("stock-bot", "gsk-1", "dividend.json"),
                &json!({ "dividendYield": 0.06 }),
                PurgePolicy::after(Duration::hours(1)),
            )
            .unwrap();

        let inventory = pipeline.generate_inventory().await.unwrap();
        assert_eq!(inventory.keys().collect::<Vec<_>>(), vec!["GSK"]);
        assert_eq!(inventory["GSK"].quantity, dec!(6));
        assert_eq!(inventory["GSK"].invested, dec!(56));
        assert_eq!(inventory["GSK"].dividend_yield, dec!(0.06));

        let rollup = pipeline.generate_monthly().unwrap();
        let labels: Vec<_> = rollup.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["01/2021", "02/2021"]);

        let stats = pipeline.generate_top_dividends().unwrap();
        assert_eq!(stats["GSK"].number_of_payments, 2);
        assert_eq!(stats["GSK"].dividend_yield, dec!(6));

        for file in [INVENTORY_FILE, MONTHLY_FILE, TOP_DIVIDENDS_FILE] {
            assert!(pipeline.artifact_path(file).exists(), "{} missing", file);
        }
        let written = std::fs::read_to_string(pipeline.artifact_path(INVENTORY_FILE)).unwrap();
        assert!(written.starts_with("{\n  \"GSK\": {\n    \"dividendYield\": 0.06,"));
    }

    #[tokio::test]
    async fn test_generate_without_fetch_fails() {
        let output = TempDir::new().unwrap();
        let (pipeline, _cache) = pipeline(&output);

        let err = pipeline.generate_inventory().await.unwrap_err();
        assert!(format!("{:#}", err).contains("divtrack fetch"));
        assert!(pipeline.generate_monthly().is_err());
    }

    #[test]
    fn test_top_dividends_requires_inventory_artifact() {
        let output = TempDir::new().unwrap();
        let (pipeline, cache) = pipeline(&output);
        seed(
            &cache,
            HistoryKind::Dividends,
            vec![dividend("GSK", 1.0, "2021-01-19T15:56:55+02:00")],
        );

        let err = pipeline.generate_top_dividends().unwrap_err();
        assert!(format!("{:#}", err).contains("inventory stage first"));
    }

    #[test]
    fn test_dividend_for_unheld_instrument_aborts() {
        let output = TempDir::new().unwrap();
        let (pipeline, cache) = pipeline(&output);
        seed(
            &cache,
            HistoryKind::Dividends,
            vec![dividend("TSCO", 1.0, "2021-01-19T15:56:55+02:00")],
        );
        pipeline.write_artifact(INVENTORY_FILE, &Inventory::new()).unwrap();

        let err = pipeline.generate_top_dividends().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NotInInventory(_))
        ));
        assert!(!pipeline.artifact_path(TOP_DIVIDENDS_FILE).exists());
    }

    #[test]
    fn test_artifact_write_failure_aborts_stage() {
        let output = TempDir::new().unwrap();
        let blocker = output.path().join("dashboard");
        std::fs::write(&blocker, "not a directory").unwrap();
        let (pipeline, cache) = pipeline(&output);
        seed(
            &cache,
            HistoryKind::Dividends,
            vec![dividend("GSK", 1.0, "2021-01-19T15:56:55+02:00")],
        );

        let err = pipeline.generate_monthly().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create output directory"));
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory");
    }

    #[tokio::test]
    async fn test_fetch_is_refused_offline() {
        let output = TempDir::new().unwrap();
        let (pipeline, _cache) = pipeline(&output);

        let err = pipeline.fetch_history().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Offline { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_requires_cookie() {
        let output = TempDir::new().unwrap();
        let config = Config {
            output_dir: output.path().to_path_buf(),
            ..Config::default()
        };
        let pipeline = Pipeline::with_cache(config, Arc::new(Cache::in_memory())).unwrap();

        let err = pipeline.fetch_history().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Config(_))
        ));
    }
}
