use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::paginate::Page;

pub const STATUS_FILLED: &str = "history.order.status.filled";
const FILLED_SIDE_PREFIX: &str = "history.order.filled.";
const DEFAULT_QUANTITY_PRECISION: u32 = 8;

/// One page of `/rest/history/*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub data: Vec<HistoryEntry>,
    pub has_next: bool,
    #[serde(default)]
    pub footer: Option<serde_json::Value>,
}

impl From<HistoryPage> for Page<HistoryEntry> {
    fn from(page: HistoryPage) -> Self {
        Page {
            data: page.data,
            has_next: page.has_next,
        }
    }
}

/// A history item as the web client returns it.
///
/// Orders carry the instrument in `heading`, side and quantity in
/// `sub_heading`, and their status in `additional_info`. Dividends carry the
/// instrument in `sub_heading`. Both keep the cash amount in `main_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default)]
    pub additional_info: Option<InfoBlock>,
    /// RFC 3339 with offset, e.g. `2021-01-19T15:56:55+02:00`. Also the pagination cursor.
    pub date: String,
    #[serde(default)]
    pub details_path: Option<String>,
    #[serde(default)]
    pub heading: Option<InfoBlock>,
    #[serde(default)]
    pub main_info: Option<InfoBlock>,
    #[serde(default)]
    pub sub_heading: Option<InfoBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoBlock {
    pub key: String,
    #[serde(default)]
    pub context: Option<InfoContext>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretty_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_precision: Option<u32>,
    /// Fields we do not interpret, kept so cached history round-trips.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl InfoBlock {
    fn context(&self) -> Option<&InfoContext> {
        self.context.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// `history.order.filled.buy` -> `Buy`
    pub fn from_key(key: &str) -> Option<Self> {
        match key.strip_prefix(FILLED_SIDE_PREFIX)? {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Order,
    Dividend,
}

/// Normalized history event, input to the aggregators.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub instrument: String,
    pub name: String,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub quantity_precision: u32,
    pub side: Option<Side>,
    pub status: Option<String>,
    pub date: DateTime<FixedOffset>,
}

impl Transaction {
    pub fn is_filled(&self) -> bool {
        self.status.as_deref() == Some(STATUS_FILLED)
    }

    pub fn from_order(entry: &HistoryEntry) -> Result<Self> {
        let instrument_ctx = entry
            .heading
            .as_ref()
            .and_then(InfoBlock::context)
            .ok_or_else(|| anyhow!("order at {} has no instrument heading", entry.date))?;
        let sub_heading = entry.sub_heading.as_ref();
        let fill_ctx = sub_heading.and_then(InfoBlock::context);

        Self::build(
            TransactionKind::Order,
            entry,
            instrument_ctx,
            fill_ctx,
            sub_heading.and_then(|block| Side::from_key(&block.key)),
        )
    }

    pub fn from_dividend(entry: &HistoryEntry) -> Result<Self> {
        let instrument_ctx = entry
            .sub_heading
            .as_ref()
            .and_then(InfoBlock::context)
            .ok_or_else(|| anyhow!("dividend at {} has no instrument sub-heading", entry.date))?;

        Self::build(TransactionKind::Dividend, entry, instrument_ctx, None, None)
    }

    fn build(
        kind: TransactionKind,
        entry: &HistoryEntry,
        instrument_ctx: &InfoContext,
        fill_ctx: Option<&InfoContext>,
        side: Option<Side>,
    ) -> Result<Self> {
        let instrument = instrument_ctx
            .instrument
            .clone()
            .ok_or_else(|| anyhow!("history entry at {} has no instrument", entry.date))?;
        let date = DateTime::parse_from_rfc3339(&entry.date)
            .with_context(|| format!("Invalid history date: {}", entry.date))?;

        Ok(Self {
            kind,
            name: instrument_ctx
                .pretty_name
                .as_deref()
                .unwrap_or(&instrument)
                .trim()
                .to_string(),
            instrument,
            amount: entry
                .main_info
                .as_ref()
                .and_then(InfoBlock::context)
                .and_then(|ctx| ctx.amount)
                .unwrap_or(Decimal::ZERO),
            quantity: fill_ctx.and_then(|ctx| ctx.quantity).unwrap_or(Decimal::ZERO),
            quantity_precision: fill_ctx
                .and_then(|ctx| ctx.quantity_precision)
                .unwrap_or(DEFAULT_QUANTITY_PRECISION),
            side,
            status: entry.additional_info.as_ref().map(|info| info.key.clone()),
            date,
        })
    }
}

pub fn orders_to_transactions(entries: &[HistoryEntry]) -> Result<Vec<Transaction>> {
    entries.iter().map(Transaction::from_order).collect()
}

pub fn dividends_to_transactions(entries: &[HistoryEntry]) -> Result<Vec<Transaction>> {
    entries.iter().map(Transaction::from_dividend).collect()
}
