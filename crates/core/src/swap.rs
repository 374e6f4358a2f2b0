//! Summary of a swap quote: slippage-adjusted bound, price impact, LP fee and route.
use std::fmt::{self, Display};

use num_bigint::BigUint;
use serde::Serialize;

use crate::{
    display::{format_price_impact, format_token_amount, price_impact_severity},
    token::{Token, TokenAmount, trim_fraction},
};

const BPS: u64 = 10_000;

/// Fee charged on every hop of a route, in basis points.
pub const SWAP_FEE_BPS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeType {
    ExactInput,
    ExactOutput,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteError {
    #[error("route is empty")]
    EmptyRoute,

    #[error("route starts at {found} but the input currency is {expected}")]
    RouteStart { expected: Token, found: Token },

    #[error("route ends at {found} but the output currency is {expected}")]
    RouteEnd { expected: Token, found: Token },

    #[error("LP fee must be paid in the input currency {expected}, got {found}")]
    FeeCurrency { expected: Token, found: Token },
}

/// A swap quote produced by the AMM's router. Its price impact and fee are taken as given.
#[derive(Debug, Clone)]
pub struct TradeQuote {
    trade_type: TradeType,
    input: TokenAmount,
    output: TokenAmount,
    route: Vec<Token>,
    /// Price impact without the LP fee, in percent
    price_impact: f64,
    realized_lp_fee: TokenAmount,
}

impl TradeQuote {
    pub fn new(
        trade_type: TradeType,
        input: TokenAmount,
        output: TokenAmount,
        route: Vec<Token>,
        price_impact: f64,
        realized_lp_fee: TokenAmount,
    ) -> Result<Self, QuoteError> {
        let (first, last) = match (route.first(), route.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(QuoteError::EmptyRoute),
        };
        if *first != input.token {
            return Err(QuoteError::RouteStart {
                expected: input.token.clone(),
                found: first.clone(),
            });
        }
        if *last != output.token {
            return Err(QuoteError::RouteEnd {
                expected: output.token.clone(),
                found: last.clone(),
            });
        }
        if realized_lp_fee.token != input.token {
            return Err(QuoteError::FeeCurrency {
                expected: input.token.clone(),
                found: realized_lp_fee.token.clone(),
            });
        }
        Ok(Self {
            trade_type,
            input,
            output,
            route,
            price_impact,
            realized_lp_fee,
        })
    }

    pub fn trade_type(&self) -> TradeType {
        self.trade_type
    }

    pub fn input(&self) -> &TokenAmount {
        &self.input
    }

    pub fn output(&self) -> &TokenAmount {
        &self.output
    }

    pub fn route(&self) -> &[Token] {
        &self.route
    }

    pub fn price_impact(&self) -> f64 {
        self.price_impact
    }

    pub fn realized_lp_fee(&self) -> &TokenAmount {
        &self.realized_lp_fee
    }
}

/// Fee taken from `input` over a route of `hops` pools: `input * (1 - (1 - fee)^hops)`.
pub fn realized_lp_fee(input: &TokenAmount, hops: usize, fee_bps: u64) -> TokenAmount {
    let keep = BigUint::from(BPS - fee_bps.min(BPS));
    let scale = BigUint::from(BPS);
    let mut remaining = input.raw.clone();
    for _ in 0..hops {
        remaining = remaining * &keep / &scale;
    }
    TokenAmount::new(input.token.clone(), &input.raw - remaining)
}

/// Least output accepted for an exact-input trade: `out / (1 + slippage)`.
pub fn minimum_amount_out(output: &TokenAmount, slippage_bps: u64) -> TokenAmount {
    output.mul_div(&BigUint::from(BPS), &BigUint::from(BPS + slippage_bps))
}

/// Most input spent for an exact-output trade: `in * (1 + slippage)`.
pub fn maximum_amount_in(input: &TokenAmount, slippage_bps: u64) -> TokenAmount {
    input.mul_div(&BigUint::from(BPS + slippage_bps), &BigUint::from(BPS))
}

/// `50` → `"0.5%"`.
pub fn slippage_label(slippage_bps: u64) -> String {
    let rendered = format!("{}.{:02}", slippage_bps / 100, slippage_bps % 100);
    format!("{}%", trim_fraction(&rendered))
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeSummary {
    pub trade_type: TradeType,
    /// Minimum received for exact-input trades, maximum sold for exact-output ones
    pub slippage_adjusted: String,
    pub price_impact: String,
    pub price_impact_severity: u8,
    pub lp_fee: String,
    pub route: String,
    pub slippage: String,
}

impl TradeSummary {
    pub fn new(quote: &TradeQuote, slippage_bps: u64) -> Self {
        let bound = match quote.trade_type {
            TradeType::ExactInput => minimum_amount_out(&quote.output, slippage_bps),
            TradeType::ExactOutput => maximum_amount_in(&quote.input, slippage_bps),
        };
        Self {
            trade_type: quote.trade_type,
            slippage_adjusted: format!(
                "{} {}",
                format_token_amount(Some(&bound)),
                bound.token.symbol
            ),
            price_impact: format_price_impact(Some(quote.price_impact)),
            price_impact_severity: price_impact_severity(quote.price_impact),
            lp_fee: format!(
                "{} {}",
                format_token_amount(Some(&quote.realized_lp_fee)),
                quote.input.token.symbol
            ),
            route: quote
                .route
                .iter()
                .map(|token| token.symbol.as_str())
                .collect::<Vec<_>>()
                .join(" > "),
            slippage: slippage_label(slippage_bps),
        }
    }
}

impl Display for TradeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound_label = match self.trade_type {
            TradeType::ExactInput => "Minimum received",
            TradeType::ExactOutput => "Maximum sold",
        };
        writeln!(f, "Slippage tolerance: {}", self.slippage)?;
        writeln!(f, "{bound_label}: {}", self.slippage_adjusted)?;
        writeln!(f, "Price impact: {}", self.price_impact)?;
        writeln!(f, "Liquidity provider fee: {}", self.lp_fee)?;
        write!(f, "Route: {}", self.route)
    }
}
