use num_bigint::BigUint;
use serde::Serialize;

use super::{RewardStream, StakingPool};
use crate::{
    config::ONE_DAY_SECONDS,
    display::{LOADING, format_amount_value, format_compact, format_with_commas},
    token::{Token, TokenAmount},
    tx::ActionState,
};

const APY_DISPLAY_CAP: f64 = 100_000_000.0;

/// Value of the account's and everyone's stake, in the pool's base token and in USD.
#[derive(Debug, Clone, Serialize)]
pub struct StakedAmounts {
    pub total_staked_base: TokenAmount,
    pub my_staked_base: TokenAmount,
    pub total_staked_usd: Option<f64>,
    pub my_staked_usd: Option<f64>,
    /// Value of the account's LP tokens that are not staked
    pub unstaked_usd: Option<f64>,
    pub pool_share: f64,
}

/// Values LP amounts through the base-token side of the pair: an LP token is worth
/// twice its share of the base reserve. Returns `None` when the base token is not in
/// the pair or no LP tokens exist.
pub fn staked_amounts(pool: &StakingPool, unstaked_lp: Option<&TokenAmount>) -> Option<StakedAmounts> {
    let reserve = pool.reserves.reserve_of(&pool.base_token)?;
    let lp_supply = &pool.reserves.total_supply;
    if lp_supply.is_zero() {
        return None;
    }
    let two_reserves = &reserve.raw * BigUint::from(2u32);
    let in_base = |lp: &TokenAmount| {
        TokenAmount::new(pool.base_token.clone(), &lp.raw * &two_reserves / &lp_supply.raw)
    };
    let in_usd = |amount: &TokenAmount| pool.base_price_usd.map(|price| amount.to_f64() * price);

    let total_staked_base = in_base(&pool.total_staked_amount);
    let my_staked_base = in_base(&pool.staked_amount);
    Some(StakedAmounts {
        total_staked_usd: in_usd(&total_staked_base),
        my_staked_usd: in_usd(&my_staked_base),
        unstaked_usd: unstaked_lp.and_then(|lp| in_usd(&in_base(lp))),
        pool_share: pool.pool_share(),
        total_staked_base,
        my_staked_base,
    })
}

/// USD value of everything the pool emits per day. Zero once the pool has ended.
pub fn daily_reward_usd(pool: &StakingPool) -> f64 {
    if pool.is_ended() {
        return 0.0;
    }
    pool.rewards()
        .streams()
        .map(|stream| stream.rate * ONE_DAY_SECONDS as f64 * stream.price)
        .sum()
}

/// Daily rewards of all pools, as shown on the landing page.
pub fn total_daily_rewards_usd<'a>(pools: impl IntoIterator<Item = &'a StakingPool>) -> f64 {
    pools.into_iter().map(daily_reward_usd).sum()
}

/// Rewards paid over a month relative to the value staked, as a fraction.
pub fn per_month_return(pool: &StakingPool, staked: &StakedAmounts) -> Option<f64> {
    let total = staked.total_staked_usd.filter(|usd| *usd > 0.0)?;
    Some(daily_reward_usd(pool) * 30.0 / total)
}

/// Yearly return in percent of monthly compounded rewards plus the pool's trading fee
/// APY (a fraction). Zero when the pool earns no fees.
pub fn apy_with_fee(per_month_rewards: f64, fee_apy: f64) -> f64 {
    if fee_apy <= 0.0 {
        return 0.0;
    }
    ((1.0 + per_month_rewards + fee_apy / 12.0).powi(12) - 1.0) * 100.0
}

pub fn format_apy(apy: f64) -> String {
    if apy > APY_DISPLAY_CAP {
        format!(">{}", format_with_commas(APY_DISPLAY_CAP, 0))
    } else {
        format_with_commas(apy, 2)
    }
}

/// The account's rewards per day from `stream`.
pub fn user_daily_rate(stream: &RewardStream) -> String {
    format_amount_value(stream.reward_rate.to_f64() * ONE_DAY_SECONDS as f64)
}

/// USD value of all unclaimed rewards.
pub fn earned_usd(pool: &StakingPool) -> f64 {
    pool.rewards()
        .streams()
        .map(|stream| stream.earned.to_f64() * stream.price)
        .sum()
}

pub fn earned_usd_label(earned_usd: f64) -> String {
    if earned_usd > 0.0 && earned_usd < 0.001 {
        "< $0.001".to_string()
    } else {
        format!("${}", format_with_commas(earned_usd, 3))
    }
}

/// `"1,234.5 QUICK / day"`
pub fn pool_reward_rate_label(stream: &RewardStream) -> String {
    format!(
        "{} {} / day",
        format_with_commas(stream.rate * ONE_DAY_SECONDS as f64, 2),
        stream.token.symbol
    )
}

/// Total value locked, in USD when priced and in the base token otherwise.
pub fn tvl_label(staked: Option<&StakedAmounts>) -> String {
    match staked {
        Some(StakedAmounts {
            total_staked_usd: Some(usd),
            ..
        }) => format!("${}", format_compact(*usd)),
        Some(staked) => format!(
            "{} {}",
            format_compact(staked.total_staked_base.to_f64()),
            staked.total_staked_base.token.symbol
        ),
        None => LOADING.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StakeInputError {
    #[error("Enter an amount")]
    EnterAmount,

    #[error("Connect wallet")]
    BalanceUnknown,

    #[error("Insufficient balance")]
    InsufficientBalance,
}

/// Parses a typed amount of `token` and checks it against the available balance.
pub fn derive_stake_amount(
    typed: &str,
    token: &Token,
    available: Option<&TokenAmount>,
) -> Result<TokenAmount, StakeInputError> {
    let parsed = TokenAmount::parse(token, typed).ok_or(StakeInputError::EnterAmount)?;
    let available = available.ok_or(StakeInputError::BalanceUnknown)?;
    if parsed.raw > available.raw {
        return Err(StakeInputError::InsufficientBalance);
    }
    Ok(parsed)
}

fn within(requested: Option<&TokenAmount>, limit: Option<&TokenAmount>) -> bool {
    match (requested, limit) {
        (Some(requested), Some(limit)) => {
            requested.token == limit.token && !requested.is_zero() && requested.raw <= limit.raw
        }
        _ => false,
    }
}

/// Nothing in flight, and `0 < requested <= unstaked balance`.
pub fn stake_enabled(
    state: &ActionState,
    requested: Option<&TokenAmount>,
    unstaked_balance: Option<&TokenAmount>,
) -> bool {
    state.is_idle() && within(requested, unstaked_balance)
}

/// Nothing in flight, and `0 < requested <= staked`.
pub fn unstake_enabled(state: &ActionState, requested: Option<&TokenAmount>, staked: &TokenAmount) -> bool {
    state.is_idle() && within(requested, Some(staked))
}

/// Nothing in flight and something earned.
pub fn claim_enabled(state: &ActionState, earned: &TokenAmount) -> bool {
    !earned.is_zero() && state.is_idle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        farm::{
            Rewards,
            tests::{pool, stream},
        },
        token::tests::test_token,
        tx::{Operation, Phase},
    };
    use alloy::primitives::TxHash;
    use proptest::prelude::*;

    fn e18(n: u64) -> BigUint {
        BigUint::from(n) * BigUint::from(10u32).pow(18)
    }

    fn in_flight(op: Operation) -> ActionState {
        ActionState::InFlight {
            op,
            phase: Phase::AwaitingConfirmation(TxHash::repeat_byte(1)),
        }
    }

    #[test]
    fn staked_amounts_value_lp_through_base_reserve() {
        let p = pool(Rewards::Single(stream("QUICK", 10, 1.0, 1.0)), false).with_base_price(1.0);
        let lp = TokenAmount::new(p.lp_token().clone(), e18(25));
        let staked = staked_amounts(&p, Some(&lp)).unwrap();

        assert_eq!(staked.total_staked_base.raw, BigUint::from(1_000_000_000_000u64));
        assert_eq!(staked.my_staked_base.to_exact(), "100000");
        assert_eq!(staked.total_staked_usd, Some(1_000_000.0));
        assert_eq!(staked.my_staked_usd, Some(100_000.0));
        assert_eq!(staked.unstaked_usd, Some(50_000.0));
        assert!((staked.pool_share - 0.1).abs() < 1e-12);
        assert_eq!(tvl_label(Some(&staked)), "$1M");
    }

    #[test]
    fn unpriced_pool_reports_tvl_in_base_token() {
        let p = pool(Rewards::Single(stream("QUICK", 10, 1.0, 1.0)), false);
        let staked = staked_amounts(&p, None).unwrap();
        assert_eq!(staked.total_staked_usd, None);
        assert_eq!(staked.unstaked_usd, None);
        assert_eq!(tvl_label(Some(&staked)), "1M USDC");
        assert_eq!(tvl_label(None), LOADING);
    }

    #[test]
    fn daily_reward_of_single_pool() {
        let p = pool(Rewards::Single(stream("QUICK", 10, 10.0, 2.0)), false);
        let daily = daily_reward_usd(&p);
        assert_eq!(daily, 10.0 * 86_400.0 * 2.0);
        assert_eq!(crate::display::format_usd(Some(daily)), "$1,728,000");
    }

    #[test]
    fn dual_rewards_price_each_stream_independently() {
        let p = pool(
            Rewards::Dual {
                a: stream("DQUICK", 10, 0.5, 120.0),
                b: stream("WMATIC", 3, 2.0, 0.75),
            },
            false,
        );
        let expected = 0.5 * 86_400.0 * 120.0 + 2.0 * 86_400.0 * 0.75;
        assert!((daily_reward_usd(&p) - expected).abs() < 1e-6);
        assert!((total_daily_rewards_usd([&p, &p]) - 2.0 * expected).abs() < 1e-6);
    }

    #[test]
    fn monthly_return_feeds_apy() {
        let p = pool(Rewards::Single(stream("QUICK", 10, 1.0, 1.0)), false).with_base_price(1.0);
        let staked = staked_amounts(&p, None).unwrap();
        let monthly = per_month_return(&p, &staked).unwrap();
        assert!((monthly - 86_400.0 * 30.0 / 1_000_000.0).abs() < 1e-12);

        assert_eq!(apy_with_fee(monthly, 0.0), 0.0);
        let apy = apy_with_fee(0.01, 0.12);
        assert!((apy - ((1.02f64).powi(12) - 1.0) * 100.0).abs() < 1e-9);
        assert_eq!(format_apy(26.824179), "26.82");
        assert_eq!(format_apy(2e8), ">100,000,000");
    }

    #[test]
    fn reward_labels() {
        let mut s = stream("QUICK", 10, 0.015, 50.0);
        assert_eq!(pool_reward_rate_label(&s), "1,296 QUICK / day");
        // a tenth of the pool's emission
        assert_eq!(user_daily_rate(&s), "129.6");

        s.earned = TokenAmount::new(s.token.clone(), BigUint::from(10u32).pow(15));
        let p = pool(Rewards::Single(s), false);
        assert_eq!(earned_usd_label(earned_usd(&p)), "$0.05");
        assert_eq!(earned_usd_label(0.0004), "< $0.001");
        assert_eq!(earned_usd_label(0.0), "$0");
        assert_eq!(earned_usd_label(1234.5), "$1,234.5");
    }

    #[test]
    fn stake_input_derivation() {
        let lp = test_token("UNI-V2", 4, 18);
        let balance = TokenAmount::new(lp.clone(), e18(2));
        assert_eq!(derive_stake_amount("1.5", &lp, Some(&balance)).unwrap().raw, e18(3) / 2u32);
        assert_eq!(derive_stake_amount("2", &lp, Some(&balance)).unwrap().raw, e18(2));
        assert_eq!(derive_stake_amount("2.01", &lp, Some(&balance)), Err(StakeInputError::InsufficientBalance));
        assert_eq!(derive_stake_amount("", &lp, Some(&balance)), Err(StakeInputError::EnterAmount));
        assert_eq!(derive_stake_amount("1", &lp, None), Err(StakeInputError::BalanceUnknown));
    }

    #[test]
    fn one_slot_per_card_blocks_every_action_while_in_flight() {
        let lp = test_token("UNI-V2", 4, 18);
        let one = TokenAmount::new(lp.clone(), e18(1));
        let state = in_flight(Operation::Approve);
        assert!(!stake_enabled(&state, Some(&one), Some(&one)));
        assert!(!unstake_enabled(&state, Some(&one), &one));
        assert!(!claim_enabled(&state, &one));
    }

    #[test]
    fn amounts_of_another_token_never_enable() {
        let lp = test_token("UNI-V2", 4, 18);
        let other = test_token("OTHER", 5, 18);
        let idle = ActionState::default();
        let balance = TokenAmount::new(lp, e18(5));
        let requested = TokenAmount::new(other, e18(1));
        assert!(!stake_enabled(&idle, Some(&requested), Some(&balance)));
    }

    proptest! {
        #[test]
        fn stake_enabled_iff_positive_and_within_balance(
            amount in 0u128..1_000_000,
            balance in 0u128..1_000_000,
            busy in any::<bool>(),
        ) {
            let lp = test_token("UNI-V2", 4, 18);
            let requested = TokenAmount::new(lp.clone(), BigUint::from(amount));
            let available = TokenAmount::new(lp, BigUint::from(balance));
            let state = if busy { in_flight(Operation::Stake) } else { ActionState::default() };
            let expected = !busy && amount > 0 && amount <= balance;
            prop_assert_eq!(stake_enabled(&state, Some(&requested), Some(&available)), expected);
            prop_assert_eq!(unstake_enabled(&state, Some(&requested), &available), expected);
        }

        #[test]
        fn stake_enabled_at_equal_boundary(amount in 1u128..u128::MAX) {
            let lp = test_token("UNI-V2", 4, 18);
            let requested = TokenAmount::new(lp, BigUint::from(amount));
            prop_assert!(stake_enabled(&ActionState::default(), Some(&requested), Some(&requested.clone())));
        }

        #[test]
        fn claim_enabled_iff_earned(earned in 0u128..1_000, op in 0usize..5) {
            let token = test_token("QUICK", 10, 18);
            let earned_amount = TokenAmount::new(token, BigUint::from(earned));
            let state = match op {
                0 => in_flight(Operation::Approve),
                1 => in_flight(Operation::Stake),
                2 => in_flight(Operation::Unstake),
                3 => in_flight(Operation::Claim),
                _ => ActionState::default(),
            };
            let enabled = claim_enabled(&state, &earned_amount);
            if earned == 0 {
                prop_assert!(!enabled);
            } else {
                prop_assert_eq!(enabled, state.is_idle());
            }
        }
    }
}
