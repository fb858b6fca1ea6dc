use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use super::{Inventory, InventoryEntry};
use crate::providers::YieldChain;
use crate::trading212::{Side, Transaction, TransactionKind};
use crate::utils::round_half_up;

const INVESTED_DP: u32 = 8;

/// Yields already resolved during this run, so each instrument is looked up
/// at most once.
#[derive(Debug, Default)]
pub struct YieldMemo {
    resolved: HashMap<String, Decimal>,
}

impl YieldMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(&mut self, symbol: &str, yields: &YieldChain) -> Result<Decimal> {
        if let Some(dividend_yield) = self.resolved.get(symbol) {
            return Ok(*dividend_yield);
        }
        let dividend_yield = yields.resolve(symbol).await?;
        self.resolved.insert(symbol.to_string(), dividend_yield);
        Ok(dividend_yield)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Fold filled orders, in the order given, into current holdings.
///
/// Quantity never drops below zero and is rounded to the order's quantity
/// precision; a holding whose quantity reaches exactly zero is removed.
pub async fn build_inventory(
    transactions: &[Transaction],
    yields: &YieldChain,
    memo: &mut YieldMemo,
) -> Result<Inventory> {
    let mut inventory = Inventory::new();

    for tx in transactions {
        if tx.kind != TransactionKind::Order || !tx.is_filled() {
            continue;
        }
        let Some(side) = tx.side else {
            continue;
        };

        let (previous_quantity, previous_invested) = inventory
            .get(&tx.instrument)
            .map(|entry| (entry.quantity, entry.invested))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        let quantity = match side {
            Side::Buy => previous_quantity + tx.quantity,
            Side::Sell => previous_quantity - tx.quantity,
        };
        let quantity = round_half_up(quantity.max(Decimal::ZERO), tx.quantity_precision);

        if quantity.is_zero() {
            if inventory.remove(&tx.instrument).is_some() {
                debug!("{} fully sold on {}", tx.instrument, tx.date);
            }
            continue;
        }

        let invested = match side {
            Side::Buy => previous_invested + tx.amount,
            Side::Sell => previous_invested - tx.amount,
        };

        let dividend_yield = memo.resolve(&tx.instrument, yields).await?;
        inventory.insert(
            tx.instrument.clone(),
            InventoryEntry {
                dividend_yield,
                invested: round_half_up(invested, INVESTED_DP),
                name: tx.name.trim().to_string(),
                quantity,
            },
        );
    }

    Ok(inventory)
}

pub fn total_invested(inventory: &Inventory) -> Decimal {
    inventory.values().map(|entry| entry.invested).sum()
}
