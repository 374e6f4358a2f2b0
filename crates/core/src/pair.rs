use std::fmt::Display;

use alloy::primitives::Address;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::token::{Token, TokenAmount};

/// Represents a pair of tokens, normalized to the AMM's token0 < token1 ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    token0: Token,
    token1: Token,
    /// Address of the pair contract, which is also its LP token.
    pub liquidity_token: Address,
}

impl Pair {
    pub fn new(token_a: Token, token_b: Token, liquidity_token: Address) -> Self {
        let zero2one = token_a.address < token_b.address;
        let (token0, token1) = if zero2one {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        Self {
            token0,
            token1,
            liquidity_token,
        }
    }

    pub fn token0(&self) -> &Token {
        &self.token0
    }

    pub fn token1(&self) -> &Token {
        &self.token1
    }

    /// The LP token of this pair, with the AMM's fixed 18 decimals.
    pub fn lp_token(&self) -> Token {
        Token::new(
            self.liquidity_token,
            "UNI-V2",
            &format!("{}-{} LP", self.token0.symbol, self.token1.symbol),
            18,
        )
    }
}

impl Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.token0.symbol, self.token1.symbol)
    }
}

/// Pair reserves and LP supply at one point in time.
#[derive(Debug, Clone)]
pub struct PairReserves {
    pub pair: Pair,
    pub reserve0: BigUint,
    pub reserve1: BigUint,
    pub total_supply: TokenAmount,
}

impl PairReserves {
    /// The reserve held by the pair for `token`, if it is one of the pair's tokens.
    pub fn reserve_of(&self, token: &Token) -> Option<TokenAmount> {
        if token == self.pair.token0() {
            Some(TokenAmount::new(token.clone(), self.reserve0.clone()))
        } else if token == self.pair.token1() {
            Some(TokenAmount::new(token.clone(), self.reserve1.clone()))
        } else {
            None
        }
    }
}
