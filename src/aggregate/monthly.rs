use chrono::Datelike;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::MonthlyRollup;
use crate::trading212::{Transaction, TransactionKind};
use crate::utils::round_half_up;

const TOTAL_DP: u32 = 2;

/// Dividend income per calendar month, oldest month first.
///
/// Months are taken from the payment timestamp in its own UTC offset.
pub fn monthly_rollup(dividends: &[Transaction]) -> Vec<MonthlyRollup> {
    let mut by_month: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

    for tx in dividends.iter().filter(|tx| tx.kind == TransactionKind::Dividend) {
        *by_month
            .entry((tx.date.year(), tx.date.month()))
            .or_insert(Decimal::ZERO) += tx.amount;
    }

    by_month
        .into_iter()
        .map(|((year, month), total)| MonthlyRollup {
            label: format!("{:02}/{}", month, year),
            month,
            total: round_half_up(total, TOTAL_DP),
            year,
        })
        .collect()
}
