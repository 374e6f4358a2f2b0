//! Staking pools ("farms"): their descriptors, the values derived from them for a
//! user, and loading them from chain and subgraph.
use alloy::primitives::Address;

use crate::{
    pair::{Pair, PairReserves},
    token::{Token, TokenAmount},
};

pub use derive::{
    StakeInputError, StakedAmounts, apy_with_fee, claim_enabled, daily_reward_usd,
    derive_stake_amount, earned_usd, earned_usd_label, format_apy, per_month_return,
    pool_reward_rate_label, stake_enabled, staked_amounts, total_daily_rewards_usd,
    tvl_label, unstake_enabled, user_daily_rate,
};
pub use loader::{FarmLoader, FarmReads, LoadedFarm, PricedToken, TokenBook, build_pool};

mod derive;
mod loader;

/// One reward token emitted by a staking pool.
#[derive(Debug, Clone)]
pub struct RewardStream {
    pub token: Token,
    /// Whole reward tokens emitted by the pool per second
    pub rate: f64,
    /// USD price of one reward token
    pub price: f64,
    /// The account's share of the emission, per second
    pub reward_rate: TokenAmount,
    /// Emission of the whole pool, per second
    pub total_reward_rate: TokenAmount,
    pub earned: TokenAmount,
}

impl RewardStream {
    fn stop(&mut self) {
        self.rate = 0.0;
        self.reward_rate = TokenAmount::zero(self.reward_rate.token.clone());
        self.total_reward_rate = TokenAmount::zero(self.total_reward_rate.token.clone());
    }
}

#[derive(Debug, Clone)]
pub enum Rewards {
    Single(RewardStream),
    Dual { a: RewardStream, b: RewardStream },
}

impl Rewards {
    pub fn streams(&self) -> impl Iterator<Item = &RewardStream> {
        let (first, second) = match self {
            Rewards::Single(stream) => (stream, None),
            Rewards::Dual { a, b } => (a, Some(b)),
        };
        std::iter::once(first).chain(second)
    }

    pub fn is_dual(&self) -> bool {
        matches!(self, Rewards::Dual { .. })
    }

    fn stop(&mut self) {
        match self {
            Rewards::Single(stream) => stream.stop(),
            Rewards::Dual { a, b } => {
                a.stop();
                b.stop();
            }
        }
    }
}

/// A staking pool as seen by one account. Amounts are unsigned by construction and
/// an ended pool emits nothing.
#[derive(Debug, Clone)]
pub struct StakingPool {
    pub staking_address: Address,
    /// Reserves and LP supply of the staked pair
    pub reserves: PairReserves,
    /// Token the pool is valued in
    pub base_token: Token,
    /// USD price of the base token, when known
    pub base_price_usd: Option<f64>,
    /// LP tokens staked by the account
    pub staked_amount: TokenAmount,
    /// LP tokens staked by everyone
    pub total_staked_amount: TokenAmount,
    rewards: Rewards,
    ended: bool,
}

impl StakingPool {
    pub fn new(
        staking_address: Address,
        reserves: PairReserves,
        base_token: Token,
        staked_amount: TokenAmount,
        total_staked_amount: TokenAmount,
        mut rewards: Rewards,
        ended: bool,
    ) -> Self {
        if ended {
            rewards.stop();
        }
        Self {
            staking_address,
            reserves,
            base_token,
            base_price_usd: None,
            staked_amount,
            total_staked_amount,
            rewards,
            ended,
        }
    }

    pub fn with_base_price(mut self, price_usd: f64) -> Self {
        self.base_price_usd = (price_usd.is_finite() && price_usd > 0.0).then_some(price_usd);
        self
    }

    pub fn pair(&self) -> &Pair {
        &self.reserves.pair
    }

    pub fn lp_token(&self) -> &Token {
        &self.staked_amount.token
    }

    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Share of the pool staked by the account, in `[0, 1]`.
    pub fn pool_share(&self) -> f64 {
        if self.total_staked_amount.is_zero() {
            return 0.0;
        }
        let share = self.staked_amount.to_f64() / self.total_staked_amount.to_f64();
        share.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::token::tests::test_token;
    use num_bigint::BigUint;
    use proptest::prelude::*;

    pub(crate) fn stream(symbol: &str, last_byte: u8, rate: f64, price: f64) -> RewardStream {
        let token = test_token(symbol, last_byte, 18);
        let per_second = BigUint::from((rate * 1e18) as u128);
        RewardStream {
            rate,
            price,
            reward_rate: TokenAmount::new(token.clone(), per_second.clone() / 10u32),
            total_reward_rate: TokenAmount::new(token.clone(), per_second),
            earned: TokenAmount::zero(token.clone()),
            token,
        }
    }

    /// USDC/WMATIC pool: 1 000 000 USDC against 2 000 000 WMATIC, 1 000 LP tokens minted,
    /// 500 staked in total, 50 of them by the account.
    pub(crate) fn pool(rewards: Rewards, ended: bool) -> StakingPool {
        let usdc = test_token("USDC", 2, 6);
        let wmatic = test_token("WMATIC", 3, 18);
        let pair = Pair::new(usdc.clone(), wmatic, Address::repeat_byte(0x44));
        let lp = pair.lp_token();
        let e18 = BigUint::from(10u32).pow(18);
        let reserves = PairReserves {
            reserve0: BigUint::from(1_000_000u64) * BigUint::from(1_000_000u64),
            reserve1: BigUint::from(2_000_000u64) * &e18,
            total_supply: TokenAmount::new(lp.clone(), BigUint::from(1_000u32) * &e18),
            pair,
        };
        StakingPool::new(
            Address::repeat_byte(0x55),
            reserves,
            usdc,
            TokenAmount::new(lp.clone(), BigUint::from(50u32) * &e18),
            TokenAmount::new(lp, BigUint::from(500u32) * &e18),
            rewards,
            ended,
        )
    }

    #[test]
    fn ended_pool_zeroes_every_rate() {
        let p = pool(
            Rewards::Dual {
                a: stream("DQUICK", 10, 0.5, 1.0),
                b: stream("WMATIC", 3, 2.0, 0.8),
            },
            true,
        );
        assert!(p.is_ended());
        for s in p.rewards().streams() {
            assert_eq!(s.rate, 0.0);
            assert!(s.reward_rate.is_zero());
            assert!(s.total_reward_rate.is_zero());
        }
    }

    #[test]
    fn pool_share() {
        let p = pool(Rewards::Single(stream("QUICK", 10, 1.0, 1.0)), false);
        assert!((p.pool_share() - 0.1).abs() < 1e-12);
        assert!(!p.rewards().is_dual());
    }

    proptest! {
        #[test]
        fn ended_pool_emits_nothing(rate in 0f64..1e6, price in 0f64..1e4, dual in any::<bool>()) {
            let rewards = if dual {
                Rewards::Dual { a: stream("A", 10, rate, price), b: stream("B", 11, rate, price) }
            } else {
                Rewards::Single(stream("A", 10, rate, price))
            };
            let p = pool(rewards, true);
            prop_assert_eq!(daily_reward_usd(&p), 0.0);
        }
    }
}
