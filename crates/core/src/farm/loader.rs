//! Assembles [`StakingPool`]s for the farm page from staking contract reads, pair
//! reserves and subgraph prices.
use std::collections::HashMap;

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use color_eyre::eyre::{self, Context as _, OptionExt as _, bail};
use num_bigint::BigUint;
use tracing::{debug, instrument, warn};

use super::{RewardStream, Rewards, StakingPool};
use crate::{
    analytics::Analytics,
    config::{FarmConfig, ONE_DAY_SECONDS},
    contracts::{IERC20, IStakingDualRewards, IStakingRewards, IUniswapV2Pair},
    pair::{Pair, PairReserves},
    subgraph::{
        Subgraph, SubgraphId,
        models::{PairFields, TokenRef},
    },
    token::{Token, TokenAmount},
};

/// Raw on-chain state of one farm for one account.
#[derive(Debug, Clone, Default)]
pub struct FarmReads {
    pub staked: U256,
    pub total_staked: U256,
    /// Earned rewards, one per reward token
    pub earned: Vec<U256>,
    /// Pool-wide emission per second, one per reward token
    pub reward_rates: Vec<U256>,
    pub period_finish: u64,
    /// LP tokens held by the account outside the farm
    pub unstaked_lp: U256,
    pub reserve0: BigUint,
    pub reserve1: BigUint,
    pub lp_total_supply: U256,
}

/// Reads everything [`build_pool`] needs from the staking contract and the pair.
pub async fn read_farm<P: Provider + Clone>(
    provider: &P,
    farm: &FarmConfig,
    account: Address,
) -> eyre::Result<FarmReads> {
    let staking = IStakingRewards::new(farm.staking_address, provider.clone());
    let pair = IUniswapV2Pair::new(farm.pair, provider.clone());
    let lp = IERC20::new(farm.pair, provider.clone());

    let staked: U256 = staking.balanceOf(account).call().await?;
    let total_staked: U256 = staking.totalSupply().call().await?;
    let period_finish: U256 = staking.periodFinish().call().await?;

    let (earned, reward_rates) = match farm.rewards.len() {
        1 => {
            let earned: U256 = staking.earned(account).call().await?;
            let rate: U256 = staking.rewardRate().call().await?;
            (vec![earned], vec![rate])
        }
        2 => {
            let dual = IStakingDualRewards::new(farm.staking_address, provider.clone());
            let earned_a: U256 = dual.earnedA(account).call().await?;
            let earned_b: U256 = dual.earnedB(account).call().await?;
            let rate_a: U256 = dual.rewardRateA().call().await?;
            let rate_b: U256 = dual.rewardRateB().call().await?;
            (vec![earned_a, earned_b], vec![rate_a, rate_b])
        }
        n => bail!("farm {} has {n} reward tokens, expected 1 or 2", farm.staking_address),
    };

    let unstaked_lp: U256 = lp.balanceOf(account).call().await?;
    let reserves = pair.getReserves().call().await?;
    let lp_total_supply: U256 = pair.totalSupply().call().await?;

    Ok(FarmReads {
        staked,
        total_staked,
        earned,
        reward_rates,
        period_finish: period_finish.saturating_to::<u64>(),
        unstaked_lp,
        reserve0: BigUint::from(reserves.reserve0.to::<u128>()),
        reserve1: BigUint::from(reserves.reserve1.to::<u128>()),
        lp_total_supply,
    })
}

#[derive(Debug, Clone)]
pub struct PricedToken {
    pub token: Token,
    pub price_usd: f64,
}

/// Tokens with their current USD price, by address.
#[derive(Debug, Clone, Default)]
pub struct TokenBook(HashMap<Address, PricedToken>);

impl TokenBook {
    pub fn insert(&mut self, priced: PricedToken) {
        self.0.insert(priced.token.address, priced);
    }

    pub fn get(&self, address: &Address) -> Option<&PricedToken> {
        self.0.get(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<PricedToken> for TokenBook {
    fn from_iter<I: IntoIterator<Item = PricedToken>>(iter: I) -> Self {
        let mut book = Self::default();
        for priced in iter {
            book.insert(priced);
        }
        book
    }
}

/// A pool ready for display along with the account's LP balance outside of it.
#[derive(Debug, Clone)]
pub struct LoadedFarm {
    pub pool: StakingPool,
    pub unstaked_lp: TokenAmount,
}

fn pair_from_subgraph(fields: &PairFields) -> Pair {
    let token = |t: &TokenRef| {
        Token::new(
            t.id.to_address(),
            &t.symbol,
            t.name.as_deref().unwrap_or(&t.symbol),
            t.decimals,
        )
    };
    Pair::new(token(&fields.token0), token(&fields.token1), fields.id.to_address())
}

/// Combines a farm descriptor, its pair, the account's on-chain reads and token prices.
///
/// The pool counts as ended when the descriptor says so or when its reward period
/// finished at or before `now`.
pub fn build_pool(
    farm: &FarmConfig,
    pair: &PairFields,
    reads: &FarmReads,
    book: &TokenBook,
    now: u64,
) -> eyre::Result<LoadedFarm> {
    if farm.rewards.len() != reads.reward_rates.len() || farm.rewards.len() != reads.earned.len() {
        bail!("reward reads don't match the farm's {} reward tokens", farm.rewards.len());
    }

    let pair = pair_from_subgraph(pair);
    let lp = pair.lp_token();
    let amount = |raw: U256| TokenAmount::from_u256(lp.clone(), raw);
    let staked = amount(reads.staked);
    let total_staked = amount(reads.total_staked);

    let mut streams = Vec::with_capacity(farm.rewards.len());
    for ((reward, rate), earned) in farm.rewards.iter().zip(&reads.reward_rates).zip(&reads.earned) {
        let priced = book
            .get(&reward.token)
            .ok_or_eyre(format!("reward token {} has no price", reward.token))?;
        let total_rate = TokenAmount::from_u256(priced.token.clone(), *rate);
        let reward_rate = if total_staked.is_zero() {
            TokenAmount::zero(priced.token.clone())
        } else {
            total_rate.mul_div(&staked.raw, &total_staked.raw)
        };
        streams.push(RewardStream {
            token: priced.token.clone(),
            rate: reward.rate_per_day / ONE_DAY_SECONDS as f64,
            price: priced.price_usd,
            reward_rate,
            total_reward_rate: total_rate,
            earned: TokenAmount::from_u256(priced.token.clone(), *earned),
        });
    }
    let mut streams = streams.into_iter();
    let rewards = match (streams.next(), streams.next()) {
        (Some(a), Some(b)) => Rewards::Dual { a, b },
        (Some(single), None) => Rewards::Single(single),
        _ => bail!("farm {} has no reward tokens", farm.staking_address),
    };

    let base_token = match farm.base_token {
        Some(address) if address == pair.token0().address => pair.token0().clone(),
        Some(address) if address == pair.token1().address => pair.token1().clone(),
        Some(address) => bail!("base token {address} is not part of pair {pair}"),
        None => pair.token0().clone(),
    };
    let base_price = book.get(&base_token.address).map(|p| p.price_usd);

    let ended = farm.ended || (reads.period_finish > 0 && reads.period_finish <= now);
    let reserves = PairReserves {
        reserve0: reads.reserve0.clone(),
        reserve1: reads.reserve1.clone(),
        total_supply: amount(reads.lp_total_supply),
        pair,
    };
    let mut pool = StakingPool::new(
        farm.staking_address,
        reserves,
        base_token,
        staked,
        total_staked,
        rewards,
        ended,
    );
    if let Some(price) = base_price {
        pool = pool.with_base_price(price);
    }

    Ok(LoadedFarm {
        pool,
        unstaked_lp: amount(reads.unstaked_lp),
    })
}

/// Loads the farm page for one account.
pub struct FarmLoader<P, S> {
    provider: P,
    analytics: Analytics<S>,
    account: Address,
}

impl<P: Provider + Clone, S: Subgraph + Sync> FarmLoader<P, S> {
    pub fn new(provider: P, analytics: Analytics<S>, account: Address) -> Self {
        Self {
            provider,
            analytics,
            account,
        }
    }

    /// Loads every farm in `farms`. A farm that fails to load is logged and skipped.
    #[instrument(skip_all, fields(farms = farms.len(), account = %self.account))]
    pub async fn load(&self, farms: &[FarmConfig], now: u64) -> eyre::Result<Vec<LoadedFarm>> {
        let pair_ids: Vec<SubgraphId> = farms.iter().map(|f| SubgraphId::from(f.pair)).collect();
        let pairs = self.analytics.pairs(&pair_ids).await?;

        let mut token_ids: Vec<SubgraphId> = farms
            .iter()
            .flat_map(|f| f.rewards.iter().map(|r| r.token).chain(f.base_token))
            .chain(pairs.values().flat_map(|p| [p.token0.id.to_address(), p.token1.id.to_address()]))
            .map(SubgraphId::from)
            .collect();
        token_ids.sort();
        token_ids.dedup();
        let book: TokenBook = self
            .analytics
            .token_prices(&token_ids)
            .await
            .wrap_err("failed to price farm tokens")?
            .into_iter()
            .map(|(fields, price_usd)| PricedToken {
                token: Token::new(fields.id.to_address(), &fields.symbol, &fields.name, fields.decimals),
                price_usd,
            })
            .collect();
        debug!(tokens = book.len(), "priced farm tokens");

        let mut loaded = Vec::with_capacity(farms.len());
        for farm in farms {
            let Some(pair) = pairs.get(&SubgraphId::from(farm.pair)) else {
                warn!(pair = %farm.pair, "pair not indexed, skipping farm");
                continue;
            };
            let result = match read_farm(&self.provider, farm, self.account).await {
                Ok(reads) => build_pool(farm, pair, &reads, &book, now),
                Err(err) => Err(err),
            };
            match result {
                Ok(pool) => loaded.push(pool),
                Err(err) => warn!(farm = %farm.staking_address, "failed to load farm: {err:#}"),
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RewardConfig,
        farm::{daily_reward_usd, staked_amounts},
        token::tests::test_token,
    };

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18))
    }

    fn token_ref(token: &Token) -> TokenRef {
        TokenRef {
            id: SubgraphId::from(token.address),
            symbol: token.symbol.clone(),
            name: Some(token.name.clone()),
            decimals: token.decimals,
        }
    }

    fn usdc() -> Token {
        test_token("USDC", 2, 6)
    }

    fn wmatic() -> Token {
        test_token("WMATIC", 3, 18)
    }

    fn quick() -> Token {
        test_token("QUICK", 10, 18)
    }

    fn pair_fields() -> PairFields {
        PairFields {
            id: SubgraphId::from(Address::repeat_byte(0x44)),
            tracked_reserve_eth: 0.0,
            volume_usd: 0.0,
            reserve_usd: 2_000_000.0,
            total_supply: 1_000.0,
            token0: token_ref(&usdc()),
            token1: token_ref(&wmatic()),
        }
    }

    fn farm(rewards: Vec<RewardConfig>) -> FarmConfig {
        FarmConfig {
            staking_address: Address::repeat_byte(0x55),
            pair: Address::repeat_byte(0x44),
            base_token: None,
            rewards,
            ended: false,
        }
    }

    fn reads(rates: Vec<U256>, period_finish: u64) -> FarmReads {
        FarmReads {
            staked: e18(50),
            total_staked: e18(500),
            earned: vec![U256::ZERO; rates.len()],
            reward_rates: rates,
            period_finish,
            unstaked_lp: e18(5),
            reserve0: BigUint::from(10u64).pow(12),
            reserve1: BigUint::from(2_000_000u64) * BigUint::from(10u64).pow(18),
            lp_total_supply: e18(1_000),
        }
    }

    fn book() -> TokenBook {
        [(usdc(), 1.0), (wmatic(), 0.5), (quick(), 2.0)]
            .into_iter()
            .map(|(token, price_usd)| PricedToken { token, price_usd })
            .collect()
    }

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn single_reward_pool_from_reads() {
        let farm = farm(vec![RewardConfig {
            token: quick().address,
            rate_per_day: 864_000.0,
        }]);
        let loaded = build_pool(&farm, &pair_fields(), &reads(vec![e18(10)], NOW + 1), &book(), NOW).unwrap();
        let pool = &loaded.pool;

        assert!(!pool.is_ended());
        assert_eq!(pool.base_token, usdc());
        assert_eq!(pool.base_price_usd, Some(1.0));
        let stream = pool.rewards().streams().next().unwrap();
        assert_eq!(stream.rate, 10.0);
        assert_eq!(stream.total_reward_rate.to_u256(), e18(10));
        assert_eq!(stream.reward_rate.to_u256(), e18(1));
        assert_eq!(daily_reward_usd(pool), 1_728_000.0);
        assert_eq!(loaded.unstaked_lp.to_u256(), e18(5));

        let amounts = staked_amounts(pool, Some(&loaded.unstaked_lp)).unwrap();
        assert!((amounts.pool_share - 0.1).abs() < 1e-12);
    }

    #[test]
    fn finished_period_ends_the_pool() {
        let farm = farm(vec![
            RewardConfig { token: quick().address, rate_per_day: 100.0 },
            RewardConfig { token: wmatic().address, rate_per_day: 50.0 },
        ]);
        let loaded = build_pool(&farm, &pair_fields(), &reads(vec![e18(1), e18(2)], NOW), &book(), NOW).unwrap();

        assert!(loaded.pool.is_ended());
        assert!(loaded.pool.rewards().is_dual());
        assert_eq!(daily_reward_usd(&loaded.pool), 0.0);
    }

    #[test]
    fn empty_pool_has_no_user_rate() {
        let farm = farm(vec![RewardConfig { token: quick().address, rate_per_day: 1.0 }]);
        let mut reads = reads(vec![e18(1)], 0);
        reads.staked = U256::ZERO;
        reads.total_staked = U256::ZERO;

        let loaded = build_pool(&farm, &pair_fields(), &reads, &book(), NOW).unwrap();

        assert!(!loaded.pool.is_ended());
        assert!(loaded.pool.rewards().streams().all(|s| s.reward_rate.is_zero()));
    }

    #[test]
    fn configured_base_token_must_belong_to_pair() {
        let mut cfg = farm(vec![RewardConfig { token: quick().address, rate_per_day: 1.0 }]);
        cfg.base_token = Some(wmatic().address);
        let loaded = build_pool(&cfg, &pair_fields(), &reads(vec![e18(1)], 0), &book(), NOW).unwrap();
        assert_eq!(loaded.pool.base_token, wmatic());
        assert_eq!(loaded.pool.base_price_usd, Some(0.5));

        cfg.base_token = Some(quick().address);
        assert!(build_pool(&cfg, &pair_fields(), &reads(vec![e18(1)], 0), &book(), NOW).is_err());
    }

    #[test]
    fn unpriced_reward_token_is_an_error() {
        let farm = farm(vec![RewardConfig {
            token: Address::repeat_byte(0x99),
            rate_per_day: 1.0,
        }]);
        let err = build_pool(&farm, &pair_fields(), &reads(vec![e18(1)], 0), &book(), NOW).unwrap_err();
        assert!(err.to_string().contains("has no price"));
    }

    #[test]
    fn mismatched_reads_are_rejected() {
        let farm = farm(vec![RewardConfig { token: quick().address, rate_per_day: 1.0 }]);
        assert!(build_pool(&farm, &pair_fields(), &reads(vec![e18(1), e18(1)], 0), &book(), NOW).is_err());
    }
}
