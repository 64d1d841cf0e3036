//! Utility functions for formatting and common operations
//!
//! Centralized formatting so currency, percentages and volumes render
//! consistently across the dashboard output.

use rust_decimal::Decimal;

/// Format a price as Brazilian Real using Brazilian locale conventions:
/// thousands separator `.`, decimal separator `,`.
///
/// # Examples
/// ```
/// use b3perf::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "R$ 1.234,56");
/// assert_eq!(format_currency(dec!(-500)), "R$ -500,00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    let is_negative = value < Decimal::ZERO;
    let abs_value = value.abs();

    let formatted = format!("{:.2}", abs_value);
    let parts: Vec<&str> = formatted.split('.').collect();

    let integer_part = parts[0];
    let decimal_part = parts.get(1).unwrap_or(&"00");

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec!['.', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    format!("R$ {}{},{}", sign, with_separators, decimal_part)
}

/// Format a percentage return; `None` renders as an explicit "N/A",
/// never as a zero that could be mistaken for a flat return.
///
/// # Examples
/// ```
/// use b3perf::utils::format_return;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_return(Some(dec!(6.061))), "+6.06%");
/// assert_eq!(format_return(Some(dec!(-2.5))), "-2.50%");
/// assert_eq!(format_return(None), "N/A");
/// ```
pub fn format_return(value: Option<Decimal>) -> String {
    match value {
        Some(pct) => {
            let rounded = pct.round_dp(2);
            if rounded >= Decimal::ZERO {
                format!("+{:.2}%", rounded)
            } else {
                format!("{:.2}%", rounded)
            }
        }
        None => "N/A".to_string(),
    }
}

/// Compact financial volume: millions as "R$ 12.34M", thousands as
/// "R$ 567.8K", small values in full.
pub fn format_volume(value: Option<Decimal>) -> String {
    let Some(v) = value else {
        return "N/A".to_string();
    };
    let million = Decimal::from(1_000_000);
    let thousand = Decimal::from(1_000);
    if v >= million {
        format!("R$ {:.2}M", v / million)
    } else if v >= thousand {
        format!("R$ {:.1}K", v / thousand)
    } else if v > Decimal::ZERO {
        format!("R$ {:.2}", v)
    } else {
        "R$ 0.00".to_string()
    }
}

/// Compact trade count with an explicit estimate marker
pub fn format_trades(count: Option<crate::aggregator::TradeCount>) -> String {
    let Some(trades) = count else {
        return "N/A".to_string();
    };
    let n = trades.value();
    let text = if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    };
    if trades.is_estimated() {
        format!("{} (est.)", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::TradeCount;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency_basic() {
        assert_eq!(format_currency(dec!(1234.56)), "R$ 1.234,56");
        assert_eq!(format_currency(dec!(0.99)), "R$ 0,99");
        assert_eq!(format_currency(dec!(1000000)), "R$ 1.000.000,00");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(format_currency(dec!(-1234.56)), "R$ -1.234,56");
        assert_eq!(format_currency(dec!(-0.01)), "R$ -0,01");
    }

    #[test]
    fn test_format_return_sign_and_rounding() {
        assert_eq!(format_return(Some(dec!(6.061))), "+6.06%");
        assert_eq!(format_return(Some(dec!(0))), "+0.00%");
        assert_eq!(format_return(Some(dec!(-2.5))), "-2.50%");
    }

    #[test]
    fn test_format_return_unavailable_is_not_zero() {
        assert_eq!(format_return(None), "N/A");
        assert_ne!(format_return(None), format_return(Some(dec!(0))));
    }

    #[test]
    fn test_format_volume_scales() {
        assert_eq!(format_volume(Some(dec!(14000000))), "R$ 14.00M");
        assert_eq!(format_volume(Some(dec!(567800))), "R$ 567.8K");
        assert_eq!(format_volume(Some(dec!(123.45))), "R$ 123.45");
        assert_eq!(format_volume(None), "N/A");
    }

    #[test]
    fn test_format_trades_marks_estimates() {
        assert_eq!(format_trades(Some(TradeCount::Estimated(2_800))), "2.8K (est.)");
        assert_eq!(format_trades(Some(TradeCount::Reported(950))), "950");
        assert_eq!(
            format_trades(Some(TradeCount::Reported(1_250_000))),
            "1.25M"
        );
        assert_eq!(format_trades(None), "N/A");
    }
}
