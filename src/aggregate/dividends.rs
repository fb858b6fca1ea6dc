use anyhow::Result;
use rust_decimal::Decimal;

use super::{DividendStat, DividendStats, Inventory};
use crate::error::PipelineError;
use crate::trading212::{Transaction, TransactionKind};
use crate::utils::round_half_up;

const TOTAL_DP: u32 = 8;
const AVERAGE_DP: u32 = 2;
const YIELD_PERCENT_DP: u32 = 2;
const BANG_FOR_BUCK_DP: u32 = 5;
const MONTHS_PER_YEAR: u32 = 12;

/// Per-instrument payment statistics.
///
/// Every paying instrument must be in `inventory`, which supplies its yield
/// and invested amount; one that is not aborts the aggregation.
pub fn dividend_stats(dividends: &[Transaction], inventory: &Inventory) -> Result<DividendStats> {
    let mut stats = DividendStats::new();

    for tx in dividends.iter().filter(|tx| tx.kind == TransactionKind::Dividend) {
        let holding = inventory
            .get(&tx.instrument)
            .ok_or_else(|| PipelineError::NotInInventory(tx.instrument.clone()))?;
        let previous = stats.get(&tx.instrument);

        let number_of_payments = previous.map_or(0, |s| s.number_of_payments) + 1;
        let total = round_half_up(
            previous.map_or(Decimal::ZERO, |s| s.total) + tx.amount,
            TOTAL_DP,
        );
        let averaged = round_half_up(total / Decimal::from(number_of_payments), AVERAGE_DP);

        // History pages are only roughly newest-first, so compare dates.
        let (last_payment_date, last_payment_amount) = match previous {
            Some(s) if s.last_payment_date >= tx.date => (s.last_payment_date, s.last_payment_amount),
            _ => (tx.date, tx.amount),
        };

        let monthly_yield = holding.dividend_yield / Decimal::from(MONTHS_PER_YEAR);
        let bang_for_buck = round_half_up(
            monthly_yield * Decimal::from(number_of_payments),
            BANG_FOR_BUCK_DP,
        );

        stats.insert(
            tx.instrument.clone(),
            DividendStat {
                averaged,
                bang_for_buck,
                dividend_yield: round_half_up(
                    holding.dividend_yield * Decimal::ONE_HUNDRED,
                    YIELD_PERCENT_DP,
                ),
                invested: holding.invested,
                last_payment_amount,
                last_payment_date,
                name: tx.name.trim().to_string(),
                number_of_payments,
                symbol: tx.instrument.clone(),
                total,
            },
        );
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::fixtures::dividend;
    use crate::aggregate::InventoryEntry;
    use rust_decimal_macros::dec;

    fn inventory(entries: &[(&str, Decimal, Decimal)]) -> Inventory {
        entries
            .iter()
            .map(|(symbol, dividend_yield, invested)| {
                (
                    symbol.to_string(),
                    InventoryEntry {
                        dividend_yield: *dividend_yield,
                        invested: *invested,
                        name: format!("{} plc", symbol),
                        quantity: dec!(10),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_two_payments() {
        let inventory = inventory(&[("GSK", dec!(0.06), dec!(56))]);
        let stats = dividend_stats(
            &[
                dividend("GSK", dec!(1), "2021-01-19T00:00:00+00:00"),
                dividend("GSK", dec!(2), "2021-02-19T00:00:00+00:00"),
            ],
            &inventory,
        )
        .unwrap();

        let gsk = &stats["GSK"];
        assert_eq!(gsk.number_of_payments, 2);
        assert_eq!(gsk.total, dec!(3));
        assert_eq!(gsk.averaged, dec!(1.5));
        assert_eq!(gsk.last_payment_date.date_naive().to_string(), "2021-02-19");
        assert_eq!(gsk.last_payment_amount, dec!(2));
        assert_eq!(gsk.dividend_yield, dec!(6));
        assert_eq!(gsk.invested, dec!(56));
        // 0.06 / 12 * 2
        assert_eq!(gsk.bang_for_buck, dec!(0.01));
        assert_eq!(gsk.symbol, "GSK");
    }

    #[test]
    fn test_last_payment_uses_date_not_stream_order() {
        let inventory = inventory(&[("VOD", dec!(0.07), dec!(100))]);
        let stats = dividend_stats(
            &[
                dividend("VOD", dec!(3.1), "2021-08-06T00:00:00+00:00"),
                dividend("VOD", dec!(2.9), "2021-02-05T00:00:00+00:00"),
                dividend("VOD", dec!(3.0), "2020-08-07T00:00:00+00:00"),
            ],
            &inventory,
        )
        .unwrap();

        let vod = &stats["VOD"];
        assert_eq!(vod.last_payment_date.date_naive().to_string(), "2021-08-06");
        assert_eq!(vod.last_payment_amount, dec!(3.1));
        assert_eq!(vod.number_of_payments, 3);
        assert_eq!(vod.total, dec!(9));
        assert_eq!(vod.averaged, dec!(3));
        // 0.07 / 12 * 3 = 0.0175
        assert_eq!(vod.bang_for_buck, dec!(0.0175));
    }

    #[test]
    fn test_average_rounds_half_up() {
        let inventory = inventory(&[("BP", dec!(0), dec!(10))]);
        let stats = dividend_stats(
            &[
                dividend("BP", dec!(0.01), "2021-01-01T00:00:00+00:00"),
                dividend("BP", dec!(0.02), "2021-02-01T00:00:00+00:00"),
            ],
            &inventory,
        )
        .unwrap();

        // 0.03 / 2 = 0.015
        assert_eq!(stats["BP"].averaged, dec!(0.02));
        assert_eq!(stats["BP"].bang_for_buck, dec!(0));
    }

    #[test]
    fn test_instrument_missing_from_inventory_is_fatal() {
        let err = dividend_stats(
            &[dividend("TSCO", dec!(0.5), "2021-01-01T00:00:00+00:00")],
            &Inventory::new(),
        )
        .unwrap_err();

        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::NotInInventory(symbol)) => assert_eq!(symbol, "TSCO"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let inventory = inventory(&[("GSK", dec!(0.0512), dec!(56)), ("VOD", dec!(0.07), dec!(20))]);
        let dividends = vec![
            dividend("VOD", dec!(0.33), "2021-08-06T00:00:00+01:00"),
            dividend("GSK", dec!(0.19), "2021-07-08T00:00:00+01:00"),
            dividend("GSK", dec!(0.19), "2021-04-08T00:00:00+01:00"),
            dividend("VOD", dec!(0.31), "2021-02-05T00:00:00+00:00"),
        ];

        let first = serde_json::to_string_pretty(&dividend_stats(&dividends, &inventory).unwrap()).unwrap();
        let second = serde_json::to_string_pretty(&dividend_stats(&dividends, &inventory).unwrap()).unwrap();

        assert_eq!(first, second);
        assert!(first.find("\"GSK\"").unwrap() < first.find("\"VOD\"").unwrap());
    }
}
