//! Dashboard rollups
//!
//! Pure folds over normalized transactions. Every output is keyed by an
//! ordered map or sorted, and all arithmetic is decimal with half-up
//! rounding, so the same input always serializes to the same bytes.

pub mod dividends;
pub mod inventory;
pub mod monthly;

pub use dividends::dividend_stats;
pub use inventory::{build_inventory, total_invested, YieldMemo};
pub use monthly::monthly_rollup;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current holding of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// Annual yield as a fraction.
    #[serde(default)]
    pub dividend_yield: Decimal,
    pub invested: Decimal,
    pub name: String,
    pub quantity: Decimal,
}

/// Holdings keyed by instrument symbol.
pub type Inventory = BTreeMap<String, InventoryEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRollup {
    /// `MM/YYYY`
    pub label: String,
    /// 1-based
    pub month: u32,
    pub total: Decimal,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendStat {
    pub averaged: Decimal,
    pub bang_for_buck: Decimal,
    /// Percent, e.g. 3.8 for 3.8%.
    pub dividend_yield: Decimal,
    pub invested: Decimal,
    pub last_payment_amount: Decimal,
    pub last_payment_date: DateTime<FixedOffset>,
    pub name: String,
    pub number_of_payments: u32,
    pub symbol: String,
    pub total: Decimal,
}

pub type DividendStats = BTreeMap<String, DividendStat>;
