//! Terminal summaries printed after each stage
//!
//! The JSON artifacts are the real output; these tables are for the human
//! running the command.

use colored::Colorize;
use divtrack::aggregate::{total_invested, DividendStats, Inventory, MonthlyRollup};
use divtrack::utils::{format_currency, format_percent};
use rust_decimal::Decimal;
use std::path::Path;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

const TOP_DIVIDENDS_SHOWN: usize = 10;

pub fn format_inventory_table(inventory: &Inventory) -> String {
    if inventory.is_empty() {
        return format!("{} No open positions\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct InventoryRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Invested")]
        invested: String,
        #[tabled(rename = "Yield")]
        dividend_yield: String,
    }

    let rows: Vec<InventoryRow> = inventory
        .iter()
        .map(|(symbol, entry)| InventoryRow {
            symbol: symbol.clone(),
            name: entry.name.clone(),
            quantity: entry.quantity.to_string(),
            invested: format_currency(entry.invested),
            dividend_yield: if entry.dividend_yield.is_zero() {
                "N/A".bright_black().to_string()
            } else {
                format_percent(entry.dividend_yield)
            },
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(2..), Alignment::right());

    let mut output = format!("\n{} Inventory\n\n", "📊".cyan().bold());
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Total Invested:".bold(),
        format_currency(total_invested(inventory))
    ));
    output
}

pub fn format_monthly_table(rollup: &[MonthlyRollup]) -> String {
    if rollup.is_empty() {
        return format!("{} No dividends received yet\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct MonthRow {
        #[tabled(rename = "Month")]
        label: String,
        #[tabled(rename = "Dividends")]
        total: String,
    }

    let rows: Vec<MonthRow> = rollup
        .iter()
        .map(|month| MonthRow {
            label: month.label.clone(),
            total: format_currency(month.total),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());

    let total: Decimal = rollup.iter().map(|month| month.total).sum();
    let mut output = format!("\n{} Monthly Dividends\n\n", "💰".cyan().bold());
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Total Received:".bold(),
        format_currency(total).green()
    ));
    output
}

/// Highest total payers first; ties keep symbol order.
pub fn format_top_dividends_table(stats: &DividendStats) -> String {
    if stats.is_empty() {
        return format!("{} No dividend payers\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct StatRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Payments")]
        payments: u32,
        #[tabled(rename = "Total")]
        total: String,
        #[tabled(rename = "Average")]
        averaged: String,
        #[tabled(rename = "Last Paid")]
        last_payment: String,
        #[tabled(rename = "Yield")]
        dividend_yield: String,
    }

    let mut ranked: Vec<_> = stats.values().collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total));

    let rows: Vec<StatRow> = ranked
        .iter()
        .take(TOP_DIVIDENDS_SHOWN)
        .map(|stat| StatRow {
            symbol: stat.symbol.clone(),
            payments: stat.number_of_payments,
            total: format_currency(stat.total).green().to_string(),
            averaged: format_currency(stat.averaged),
            last_payment: format!(
                "{} ({})",
                stat.last_payment_date.format("%d/%m/%Y"),
                format_currency(stat.last_payment_amount)
            ),
            dividend_yield: format!("{:.2}%", stat.dividend_yield),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());

    let mut output = format!("\n{} Top Dividend Payers\n\n", "🏆".cyan().bold());
    output.push_str(&table.to_string());
    if stats.len() > TOP_DIVIDENDS_SHOWN {
        output.push_str(&format!(
            "\n... and {} more in top-dividends.json",
            stats.len() - TOP_DIVIDENDS_SHOWN
        ));
    }
    output.push('\n');
    output
}

pub fn format_written(path: &Path) -> String {
    format!("{} Wrote {}", "✓".green().bold(), path.display())
}
