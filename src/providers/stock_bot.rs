// Stock Bot GraphQL client
//
// Instrument ids are stable and cached forever. Dividend details change, so
// they are cached with an expiry and the namespace is pruned before each
// lookup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::YieldSource;
use crate::cache::{Cache, CacheKey, PurgePolicy};
use crate::config::Config;
use crate::error::PipelineError;

const PROVIDER: &str = "stock-bot";
const INSTRUMENT_FILE: &str = "instrument.json";
const DIVIDEND_FILE: &str = "dividend.json";

const INSTRUMENT_QUERY: &str = r#"
    query ($symbol: String!) {
      fetchInstrumentWithSymbol(symbol: $symbol) {
        id
        symbol
      }
    }
"#;

const DIVIDEND_QUERY: &str = r#"
    query ($id: ID!) {
      fetchDividend(id: $id) {
        dividendYield
      }
    }
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendInfo {
    #[serde(default)]
    pub dividend_yield: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentData {
    fetch_instrument_with_symbol: Option<Instrument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendData {
    fetch_dividend: Option<DividendInfo>,
}

pub struct StockBot {
    http: Client,
    cache: Arc<Cache>,
    endpoint: String,
    key: Option<String>,
    dividend_ttl: Duration,
    offline: bool,
}

impl StockBot {
    pub fn new(http: Client, cache: Arc<Cache>, config: &Config) -> Self {
        Self {
            http,
            cache,
            endpoint: format!("{}/graphql", config.stock_bot.host.trim_end_matches('/')),
            key: config.stock_bot_key().ok().map(str::to_string),
            dividend_ttl: Duration::hours(config.stock_bot.dividend_ttl_hours),
            offline: config.offline,
        }
    }

    /// POST a GraphQL query and return its `data`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let key = self.key.as_deref().ok_or_else(|| {
            PipelineError::Config("set stock_bot.key in config".to_string())
        })?;

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", key)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .context("Failed to send request to Stock Bot API")?;

        if !response.status().is_success() {
            return Err(PipelineError::http(PROVIDER, response.status()).into());
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .context("Failed to parse Stock Bot API response")?;

        if let Some(error) = body.errors.into_iter().next() {
            return Err(PipelineError::GraphQl(error.message).into());
        }

        body.data
            .ok_or_else(|| PipelineError::GraphQl("response has no data".to_string()).into())
    }

    pub async fn fetch_instrument(&self, symbol: &str) -> Result<Instrument> {
        self.prune();
        let key = CacheKey::new(PROVIDER, symbol, INSTRUMENT_FILE);
        if let Some(instrument) = self.cache.read_json::<Instrument>(&key) {
            return Ok(instrument);
        }
        self.ensure_online("instrument")?;

        let data: InstrumentData = self
            .request(INSTRUMENT_QUERY, json!({ "symbol": symbol }))
            .await?;
        let instrument = data
            .fetch_instrument_with_symbol
            .ok_or_else(|| PipelineError::empty(PROVIDER, symbol))?;

        if let Some(received) = instrument.symbol.as_deref() {
            if !received.eq_ignore_ascii_case(symbol) {
                return Err(PipelineError::LookupMismatch {
                    requested: symbol.to_string(),
                    received: received.to_string(),
                }
                .into());
            }
        }

        self.cache.write_json(&key, &instrument, PurgePolicy::Never)?;
        Ok(instrument)
    }

    pub async fn fetch_dividend(&self, instrument: &Instrument) -> Result<DividendInfo> {
        self.prune();
        let key = CacheKey::new(PROVIDER, &instrument.id, DIVIDEND_FILE);
        if let Some(dividend) = self.cache.read_json::<DividendInfo>(&key) {
            return Ok(dividend);
        }
        self.ensure_online("dividend")?;

        let data: DividendData = self
            .request(DIVIDEND_QUERY, json!({ "id": instrument.id }))
            .await?;
        let dividend = data
            .fetch_dividend
            .ok_or_else(|| PipelineError::empty(PROVIDER, &instrument.id))?;

        self.cache
            .write_json(&key, &dividend, PurgePolicy::after(self.dividend_ttl))?;
        Ok(dividend)
    }

    fn prune(&self) {
        if let Err(e) = self.cache.prune(PROVIDER) {
            warn!("Failed to prune {} cache: {:#}", PROVIDER, e);
        }
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

#[async_trait]
impl YieldSource for StockBot {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn dividend_yield(&self, symbol: &str) -> Result<Decimal> {
        let instrument = self.fetch_instrument(symbol).await?;
        let dividend = self.fetch_dividend(&instrument).await?;
        dividend
            .dividend_yield
            .ok_or_else(|| PipelineError::empty(PROVIDER, symbol).into())
    }
}
