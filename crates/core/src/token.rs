use std::fmt::{self, Display};

use alloy::primitives::{Address, U256};
use num_bigint::BigUint;
use num_traits::{ToPrimitive as _, Zero as _};
use serde::{Deserialize, Serialize};

/// An ERC-20 token. Two tokens are the same token iff their addresses match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, symbol: &str, name: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A raw on-chain amount of `token`, in the token's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: Token,
    pub raw: BigUint,
}

impl TokenAmount {
    pub fn new(token: Token, raw: BigUint) -> Self {
        Self { token, raw }
    }

    pub fn zero(token: Token) -> Self {
        Self::new(token, BigUint::ZERO)
    }

    pub fn from_u256(token: Token, raw: U256) -> Self {
        Self::new(token, BigUint::from_bytes_be(&raw.to_be_bytes::<32>()))
    }

    /// Parses a user-typed decimal string (`"1.5"`, `".25"`, `"10"`).
    ///
    /// Returns `None` for empty or malformed input, for input with more fractional
    /// digits than the token supports, and for zero.
    pub fn parse(token: &Token, typed: &str) -> Option<Self> {
        let raw = parse_units(typed.trim(), token.decimals)?;
        if raw.is_zero() {
            return None;
        }
        Some(Self::new(token.clone(), raw))
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_be_slice(&self.raw.to_bytes_be())
    }

    /// `self * mul / div` on the raw amount, rounding down.
    pub fn mul_div(&self, mul: &BigUint, div: &BigUint) -> Self {
        if div.is_zero() {
            return Self::zero(self.token.clone());
        }
        Self::new(self.token.clone(), &self.raw * mul / div)
    }

    /// Full-precision decimal representation, trailing zeros trimmed.
    pub fn to_exact(&self) -> String {
        format_units(&self.raw, self.token.decimals)
    }

    pub fn to_f64(&self) -> f64 {
        let scale = 10f64.powi(i32::from(self.token.decimals));
        self.raw.to_f64().map(|v| v / scale).unwrap_or(f64::MAX)
    }

    pub fn to_significant(&self, digits: usize) -> String {
        to_significant(self.to_f64(), digits)
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_exact(), self.token.symbol)
    }
}

/// Parses a decimal string into the raw integer amount with `decimals` fractional digits.
pub fn parse_units(typed: &str, decimals: u8) -> Option<BigUint> {
    let (whole, fraction) = match typed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (typed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    if fraction.len() > usize::from(decimals) {
        return None;
    }

    let mut digits = String::with_capacity(whole.len() + usize::from(decimals));
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat_n('0', usize::from(decimals) - fraction.len()));

    if digits.is_empty() {
        return Some(BigUint::ZERO);
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
}

/// Formats a raw integer amount with `decimals` fractional digits, trimming trailing zeros.
pub fn format_units(raw: &BigUint, decimals: u8) -> String {
    let digits = raw.to_str_radix(10);
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Rounds `value` to `digits` significant digits and renders it without trailing zeros.
pub fn to_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    let rendered = if magnitude >= digits as i32 {
        let step = 10f64.powi(magnitude - digits as i32 + 1);
        format!("{:.0}", (value / step).round() * step)
    } else {
        format!("{value:.decimals$}")
    };
    trim_fraction(&rendered)
}

pub(crate) fn trim_fraction(rendered: &str) -> String {
    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        rendered.to_string()
    }
}
