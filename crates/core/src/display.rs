//! Formatting of prices, amounts and percentages for display.
//!
//! Every function is pure. Missing inputs render as [`LOADING`] instead of failing.
use std::fmt::{self, Display};

use crate::token::{TokenAmount, to_significant, trim_fraction};

/// Placeholder shown while an input is not available yet.
pub const LOADING: &str = "-";

/// Price impact (in percent) from which a trade is flagged, by severity level.
pub const ALLOWED_PRICE_IMPACT_LOW: f64 = 1.0;
pub const ALLOWED_PRICE_IMPACT_MEDIUM: f64 = 3.0;
pub const ALLOWED_PRICE_IMPACT_HIGH: f64 = 5.0;
/// Trades at or above this impact should not be submitted.
pub const BLOCKED_PRICE_IMPACT_NON_EXPERT: f64 = 15.0;

const COMPACT_UNITS: [(f64, &str); 4] = [(1e3, "K"), (1e6, "M"), (1e9, "B"), (1e12, "T")];

/// Most fractional digits [`format_number`] renders; anything smaller shows as zero.
const MAX_FRACTION_DIGITS: usize = 24;

/// Renders `value` with thousands separators and at most `max_decimals` fractional
/// digits, trailing zeros trimmed: `1234.5` → `"1,234.5"`.
pub fn format_with_commas(value: f64, max_decimals: usize) -> String {
    if !value.is_finite() {
        return LOADING.to_string();
    }
    let rendered = trim_fraction(&format!("{:.*}", max_decimals, value.abs()));
    let (whole, fraction) = match rendered.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (rendered.as_str(), None),
    };

    let mut out = String::with_capacity(rendered.len() + whole.len() / 3 + 1);
    if value < 0.0 && rendered.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn round_compact(value: f64) -> f64 {
    if value.abs() >= 10.0 {
        return value.round();
    }
    if value == 0.0 {
        return 0.0;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(1 - magnitude);
    if !scale.is_finite() {
        return 0.0;
    }
    (value * scale).round() / scale
}

/// Short notation with a unit suffix: `1234` → `"1.2K"`, `12_345_678` → `"12M"`.
pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return LOADING.to_string();
    }
    let mut unit = COMPACT_UNITS
        .iter()
        .rposition(|(threshold, _)| value.abs() >= *threshold);
    loop {
        let divisor = unit.map_or(1.0, |u| COMPACT_UNITS[u].0);
        let rounded = round_compact(value / divisor);
        let next = unit.map_or(0, |u| u + 1);
        if rounded.abs() >= 1000.0 && next < COMPACT_UNITS.len() {
            unit = Some(next);
            continue;
        }
        let suffix = unit.map_or("", |u| COMPACT_UNITS[u].1);
        return format!("{rounded}{suffix}");
    }
}

/// Renders numbers below 0.001 with `show_digits` digits after the leading zeros and
/// everything else with separators: `0.000123` → `"0.000123"`.
pub fn format_number(value: f64, show_digits: usize) -> String {
    if !value.is_finite() {
        return LOADING.to_string();
    }
    if value.abs() < f64::MIN_POSITIVE {
        return "0".to_string();
    }
    let leading_zeros = (1.0 / value.abs()).log10().ceil();
    if leading_zeros < 3.0 {
        return format_with_commas(value, 3);
    }
    if !leading_zeros.is_finite() || leading_zeros as usize >= MAX_FRACTION_DIGITS {
        return "0".to_string();
    }
    let precision = (leading_zeros as usize)
        .saturating_add(show_digits)
        .min(MAX_FRACTION_DIGITS);
    format!("{value:.precision$}")
}

/// Amounts above one get separators, smaller ones three significant digits.
pub(crate) fn format_amount_value(value: f64) -> String {
    if value.abs() > 1.0 {
        format_with_commas(value, 3)
    } else {
        to_significant(value, 3)
    }
}

pub fn format_token_amount(amount: Option<&TokenAmount>) -> String {
    match amount {
        Some(amount) => format_amount_value(amount.to_f64()),
        None => LOADING.to_string(),
    }
}

pub fn format_usd(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let sign = if v < 0.0 { "-" } else { "" };
            format!("{sign}${}", format_with_commas(v.abs(), 2))
        }
        _ => LOADING.to_string(),
    }
}

/// A signed percentage with two decimals: `"+1.23%"`, `"-0.50%"`, `"0.00%"`.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let sign = if v > 0.0 { "+" } else { "" };
            format!("{sign}{v:.2}%")
        }
        _ => LOADING.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceColor {
    Up,
    Down,
    Neutral,
}

impl Display for PriceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PriceColor::Up => "up",
            PriceColor::Down => "down",
            PriceColor::Neutral => "neutral",
        })
    }
}

pub fn price_color(change: f64) -> PriceColor {
    if change > 0.0 {
        PriceColor::Up
    } else if change < 0.0 {
        PriceColor::Down
    } else {
        PriceColor::Neutral
    }
}

/// Severity of a price impact given in percent: 0 (fine) to 4 (blocked).
pub fn price_impact_severity(impact_percent: f64) -> u8 {
    [
        BLOCKED_PRICE_IMPACT_NON_EXPERT,
        ALLOWED_PRICE_IMPACT_HIGH,
        ALLOWED_PRICE_IMPACT_MEDIUM,
        ALLOWED_PRICE_IMPACT_LOW,
    ]
    .iter()
    .position(|threshold| impact_percent >= *threshold)
    .map_or(0, |i| 4 - i as u8)
}

pub fn format_price_impact(impact_percent: Option<f64>) -> String {
    match impact_percent {
        Some(v) if !v.is_finite() => LOADING.to_string(),
        Some(v) if v < 0.01 => "<0.01%".to_string(),
        Some(v) => format!("{v:.2}%"),
        None => LOADING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tests::test_token;
    use num_bigint::BigUint;
    use proptest::prelude::*;

    #[test]
    fn commas_group_thousands() {
        assert_eq!(format_with_commas(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_with_commas(999.0, 2), "999");
        assert_eq!(format_with_commas(-1234.5, 3), "-1,234.5");
        assert_eq!(format_with_commas(-0.0001, 2), "0");
        assert_eq!(format_with_commas(f64::NAN, 2), LOADING);
    }

    #[test]
    fn compact_notation() {
        assert_eq!(format_compact(0.0), "0");
        assert_eq!(format_compact(999.0), "999");
        assert_eq!(format_compact(1234.0), "1.2K");
        assert_eq!(format_compact(12_345.0), "12K");
        assert_eq!(format_compact(123_456.0), "123K");
        assert_eq!(format_compact(999_950.0), "1M");
        assert_eq!(format_compact(12_345_678.0), "12M");
        assert_eq!(format_compact(4_560_000_000.0), "4.6B");
        assert_eq!(format_compact(-2_500.0), "-2.5K");
    }

    #[test]
    fn small_numbers_keep_significant_digits() {
        assert_eq!(format_number(0.000123, 2), "0.000123");
        assert_eq!(format_number(0.5, 2), "0.5");
        assert_eq!(format_number(1234.5678, 2), "1,234.568");
        assert_eq!(format_number(0.0, 2), "0");
    }

    #[test]
    fn vanishing_values_render_as_zero() {
        assert_eq!(format_number(1e-310, 2), "0");
        assert_eq!(format_number(-1e-310, 2), "0");
        assert_eq!(format_number(1e-30, 2), "0");
        assert_eq!(format_number(0.000123, usize::MAX), format!("{:.24}", 0.000123));
        assert_eq!(format_compact(5e-324), "0");
        assert_eq!(format_compact(f64::MIN_POSITIVE), "0");
    }

    #[test]
    fn token_amounts_switch_precision_at_one() {
        let quick = test_token("QUICK", 1, 18);
        let big = TokenAmount::new(quick.clone(), BigUint::from(1_234_567_800_000_000_000_000u128));
        let small = TokenAmount::new(quick, BigUint::from(123_456_000_000_000u128));
        assert_eq!(format_token_amount(Some(&big)), "1,234.568");
        assert_eq!(format_token_amount(Some(&small)), "0.000123");
        assert_eq!(format_token_amount(None), "-");
    }

    #[test]
    fn usd_and_percent() {
        assert_eq!(format_usd(Some(1234.567)), "$1,234.57");
        assert_eq!(format_usd(Some(-3.5)), "-$3.5");
        assert_eq!(format_usd(None), LOADING);
        assert_eq!(format_percent(Some(1.234)), "+1.23%");
        assert_eq!(format_percent(Some(-0.5)), "-0.50%");
        assert_eq!(format_percent(Some(0.0)), "0.00%");
        assert_eq!(format_percent(Some(f64::INFINITY)), LOADING);
    }

    #[test]
    fn price_colors() {
        assert_eq!(price_color(0.1), PriceColor::Up);
        assert_eq!(price_color(-0.1), PriceColor::Down);
        assert_eq!(price_color(0.0), PriceColor::Neutral);
    }

    #[test]
    fn price_impact_levels() {
        assert_eq!(price_impact_severity(0.5), 0);
        assert_eq!(price_impact_severity(1.0), 1);
        assert_eq!(price_impact_severity(2.9), 1);
        assert_eq!(price_impact_severity(3.0), 2);
        assert_eq!(price_impact_severity(5.0), 3);
        assert_eq!(price_impact_severity(14.99), 3);
        assert_eq!(price_impact_severity(15.0), 4);
        assert_eq!(format_price_impact(Some(0.004)), "<0.01%");
        assert_eq!(format_price_impact(Some(2.346)), "2.35%");
        assert_eq!(format_price_impact(None), LOADING);
    }

    proptest! {
        #[test]
        fn formatting_is_deterministic(v in -1e15f64..1e15) {
            prop_assert_eq!(format_usd(Some(v)), format_usd(Some(v)));
            prop_assert_eq!(format_compact(v), format_compact(v));
        }

        #[test]
        fn formatters_are_total_over_finite_values(
            v in prop::num::f64::POSITIVE
                | prop::num::f64::NEGATIVE
                | prop::num::f64::NORMAL
                | prop::num::f64::SUBNORMAL
                | prop::num::f64::ZERO,
            digits in 0usize..8,
        ) {
            for rendered in [
                format_number(v, digits),
                format_compact(v),
                format_with_commas(v, digits),
                format_usd(Some(v)),
                format_percent(Some(v)),
            ] {
                prop_assert!(!rendered.is_empty());
                prop_assert!(!rendered.contains("NaN"), "{} rendered as {}", v, rendered);
                prop_assert!(!rendered.contains("inf"), "{} rendered as {}", v, rendered);
            }
        }

        #[test]
        fn commas_roundtrip_integers(v in 0u64..1_000_000_000_000) {
            let rendered = format_with_commas(v as f64, 0);
            prop_assert_eq!(rendered.replace(',', ""), v.to_string());
        }

        #[test]
        fn severity_is_monotonic(a in 0f64..100.0, b in 0f64..100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(price_impact_severity(lo) <= price_impact_severity(hi));
        }
    }
}
