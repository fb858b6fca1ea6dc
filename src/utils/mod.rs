//! Utility functions for rounding and formatting
//!
//! This module provides the single rounding convention used by every
//! aggregator and centralized formatting for values shown in the terminal.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round half-up (away from zero on a tie) to `dp` decimal places.
///
/// # Examples
/// ```
/// use divtrack::utils::round_half_up;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round_half_up(dec!(1.005), 2), dec!(1.01));
/// assert_eq!(round_half_up(dec!(-0.125), 2), dec!(-0.13));
/// ```
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "£" prefix (account currency)
    GBP,
    /// No currency symbol (for table cells)
    None,
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value with `,` as the thousands separator and `.` as
/// the decimal separator, rounded half-up to two places.
///
/// # Examples
/// ```
/// use divtrack::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::GBP),
///     "£1,234.56"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = round_half_up(value, 2);
    let is_negative = rounded < Decimal::ZERO;

    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::GBP => "£",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{}{}.{}", sign, prefix, with_separators, decimal_part);

    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format as pounds with symbol: "£1,234.56"
///
/// # Examples
/// ```
/// use divtrack::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "£1,234.56");
/// assert_eq!(format_currency(dec!(-500)), "-£500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::GBP)
}

/// Format a fractional yield (0.038) as a percentage ("3.80%").
pub fn format_percent(fraction: Decimal) -> String {
    format!("{:.2}%", round_half_up(fraction * Decimal::ONE_HUNDRED, 2))
}
