// Finki.io REST client
//
// Resolves ticker -> ISIN -> dividend yield. When the provider cannot give a
// yield directly, one is derived from the annual dividend and the current bid.
// Both facts are static enough to cache forever.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::YieldSource;
use crate::cache::{Cache, CacheKey, PurgePolicy};
use crate::config::Config;
use crate::error::PipelineError;
use crate::utils::round_half_up;

const PROVIDER: &str = "finkio";
const ISIN_FILE: &str = "isin.txt";
const YIELD_FILE: &str = "dividend-yield.txt";
const DERIVED_YIELD_DP: u32 = 2;

/// Body markers Finki.io sends with a 200 when it has nothing useful.
const EMPTY_SENTINELS: [&str; 3] = [
    "temporarilyunavailable",
    "no.data.found",
    "invalidorunrecognizedresponse",
];

pub fn is_empty_response(body: &str) -> bool {
    let body = body.to_lowercase();
    EMPTY_SENTINELS.iter().any(|sentinel| body.contains(sentinel))
}

pub struct Finkio {
    http: Client,
    cache: Arc<Cache>,
    base_url: String,
    key: Option<String>,
    offline: bool,
}

impl Finkio {
    pub fn new(http: Client, cache: Arc<Cache>, config: &Config) -> Self {
        Self {
            http,
            cache,
            base_url: config.finkio.base_url.trim_end_matches('/').to_string(),
            key: config.finkio_key().ok().map(str::to_string),
            offline: config.offline,
        }
    }

    pub async fn fetch_isin(&self, symbol: &str) -> Result<String> {
        let key = CacheKey::new(PROVIDER, symbol, ISIN_FILE);
        if let Some(isin) = self.cache.read_text(&key) {
            return Ok(isin.trim().to_string());
        }
        self.ensure_online("isin")?;

        let url = Url::parse_with_params(
            &format!("{}/isinAPI.php", self.base_url),
            &[("ticker", symbol)],
        )?;
        let body = self.get_text(url).await?;
        let isin = body.trim();
        if isin.is_empty() || is_empty_response(isin) {
            return Err(PipelineError::empty(PROVIDER, symbol).into());
        }

        self.cache.write_text(&key, isin, PurgePolicy::Never)?;
        Ok(isin.to_string())
    }

    pub async fn fetch_dividend_yield(&self, symbol: &str, isin: &str) -> Result<Decimal> {
        let key = CacheKey::new(PROVIDER, symbol, YIELD_FILE);
        if let Some(cached) = self.cache.read_text(&key) {
            match Decimal::from_str(cached.trim()) {
                Ok(dividend_yield) => return Ok(dividend_yield),
                Err(e) => warn!("Ignoring malformed cached yield for {}: {}", symbol, e),
            }
        }
        self.ensure_online("dividend yield")?;

        let body = self.get_text(self.function_url(isin, "dividendYield")?).await?;
        if is_empty_response(&body) {
            info!(
                "Unable to retrieve yield with `dividendYield` for {}, deriving it",
                symbol
            );
            let dividend_yield = self.calculate_dividend_yield(symbol, isin).await;
            if !dividend_yield.is_zero() {
                self.cache
                    .write_text(&key, &dividend_yield.to_string(), PurgePolicy::Never)?;
            }
            return Ok(dividend_yield);
        }

        let dividend_yield = parse_number(&body, symbol)?;
        self.cache
            .write_text(&key, &dividend_yield.to_string(), PurgePolicy::Never)?;
        Ok(dividend_yield)
    }

    /// annual dividend / bid, or zero when either side is unavailable.
    pub async fn calculate_dividend_yield(&self, symbol: &str, isin: &str) -> Decimal {
        match self.try_calculate_dividend_yield(symbol, isin).await {
            Ok(dividend_yield) => dividend_yield,
            Err(e) => {
                warn!("Unable to calculate dividend yield for {}: {:#}", symbol, e);
                Decimal::ZERO
            }
        }
    }

    async fn try_calculate_dividend_yield(&self, symbol: &str, isin: &str) -> Result<Decimal> {
        let (annual, bid) = tokio::try_join!(
            self.call_function(symbol, isin, "dividendAnnual"),
            self.call_function(symbol, isin, "bid"),
        )?;
        if bid.is_zero() {
            return Err(PipelineError::empty(PROVIDER, symbol).into());
        }

        Ok(round_half_up(annual / bid, DERIVED_YIELD_DP))
    }

    async fn call_function(&self, symbol: &str, isin: &str, function: &str) -> Result<Decimal> {
        let body = self.get_text(self.function_url(isin, function)?).await?;
        if is_empty_response(&body) {
            return Err(PipelineError::empty(PROVIDER, symbol).into());
        }
        parse_number(&body, symbol)
    }

    fn function_url(&self, isin: &str, function: &str) -> Result<Url> {
        let key = self.key.as_deref().ok_or_else(|| {
            PipelineError::Config("set finkio.key in config".to_string())
        })?;
        Ok(Url::parse_with_params(
            &format!("{}/callAPI.php", self.base_url),
            &[("isin", isin), ("key", key), ("function", function)],
        )?)
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("Failed to send request to Finki.io")?;

        if !response.status().is_success() {
            return Err(PipelineError::http(PROVIDER, response.status()).into());
        }

        response
            .text()
            .await
            .context("Failed to read Finki.io response")
    }

    fn ensure_online(&self, resource: &str) -> Result<()> {
        if self.offline {
            return Err(PipelineError::Offline {
                provider: PROVIDER.to_string(),
                resource: resource.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn parse_number(body: &str, symbol: &str) -> Result<Decimal> {
    let trimmed = body.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .with_context(|| format!("Finki.io returned a non-numeric value for {}: {:?}", symbol, trimmed))
}

#[async_trait]
impl YieldSource for Finkio {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn dividend_yield(&self, symbol: &str) -> Result<Decimal> {
        let isin = self.fetch_isin(symbol).await?;
        self.fetch_dividend_yield(symbol, &isin).await
    }
}
