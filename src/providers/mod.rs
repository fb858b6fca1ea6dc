//! Dividend yield providers
//!
//! Each provider answers "what is the annual dividend yield of this
//! instrument", caching what it learns. [`YieldChain`] asks them in order: a
//! provider error is logged and the next one is tried, and an instrument
//! nobody knows about gets a zero yield. A failed cache write is not a provider
//! error and stops the chain.

pub mod finkio;
pub mod stock_bot;

pub use finkio::Finkio;
pub use stock_bot::StockBot;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::{Config, YieldSourceKind};
use crate::error::is_cache_write;

/// Shared HTTP client for every provider.
pub fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent("Mozilla/5.0 (compatible; divtrack/0.1)")
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// A source of annual dividend yields, as a fraction (0.038 = 3.8%).
#[async_trait]
pub trait YieldSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn dividend_yield(&self, symbol: &str) -> Result<Decimal>;
}

/// Ordered fallback over several [`YieldSource`]s.
pub struct YieldChain {
    sources: Vec<Box<dyn YieldSource>>,
}

impl YieldChain {
    pub fn new(sources: Vec<Box<dyn YieldSource>>) -> Self {
        Self { sources }
    }

    pub fn from_config(config: &Config, http: &Client, cache: Arc<Cache>) -> Self {
        let sources = config
            .yield_sources
            .iter()
            .map(|kind| -> Box<dyn YieldSource> {
                match kind {
                    YieldSourceKind::StockBot => {
                        Box::new(StockBot::new(http.clone(), cache.clone(), config))
                    }
                    YieldSourceKind::Finkio => {
                        Box::new(Finkio::new(http.clone(), cache.clone(), config))
                    }
                }
            })
            .collect();
        Self::new(sources)
    }

    /// First non-zero yield any source reports, or zero.
    pub async fn resolve(&self, symbol: &str) -> Result<Decimal> {
        for source in &self.sources {
            match source.dividend_yield(symbol).await {
                Ok(dividend_yield) if !dividend_yield.is_zero() => {
                    debug!("{} yield for {}: {}", source.name(), symbol, dividend_yield);
                    return Ok(dividend_yield);
                }
                Ok(_) => debug!("{} reports no yield for {}", source.name(), symbol),
                Err(e) if is_cache_write(&e) => {
                    return Err(e.context(format!("{} yield lookup for {}", source.name(), symbol)));
                }
                Err(e) => warn!("{} yield lookup failed for {}: {:#}", source.name(), symbol, e),
            }
        }

        info!("No dividend yield found for {}, using 0", symbol);
        Ok(Decimal::ZERO)
    }
}
