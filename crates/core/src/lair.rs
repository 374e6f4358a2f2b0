//! The dQUICK staking pool ("dragon's lair"): QUICK staked for dQUICK, which earns a
//! share of every trade.
use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use color_eyre::eyre::{self, Context as _};
use num_bigint::BigUint;
use num_traits::ToPrimitive as _;
use tracing::instrument;

use crate::contracts::IDragonLair;

/// Share of traded volume routed to dQUICK holders.
const LAIR_FEE: f64 = 0.0004;

/// dQUICK and QUICK both carry 18 decimals.
const ONE_TOKEN: u64 = 1_000_000_000_000_000_000;

/// Inputs of the dQUICK staking APY.
#[derive(Debug, Clone, Copy)]
pub struct LairInfo {
    pub one_day_volume_usd: f64,
    pub dquick_total_supply: f64,
    pub dquick_to_quick: f64,
    pub quick_price: f64,
}

/// dQUICK APY in percent, compounding daily; when compounding explodes past 10 000 %
/// the simple APR is reported instead.
pub fn lair_apy(info: &LairInfo) -> Option<f64> {
    let apr = info.one_day_volume_usd * LAIR_FEE / info.dquick_total_supply * 365.0
        / (info.dquick_to_quick * info.quick_price);
    if !apr.is_finite() || apr <= 0.0 {
        return None;
    }
    let apy = (1.0 + apr / 365.0).powi(365) - 1.0;
    if apy > 100.0 {
        Some(apr * 100.0)
    } else {
        Some(apy * 100.0)
    }
}

/// On-chain state of the lair, in whole tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LairReads {
    pub dquick_total_supply: f64,
    /// QUICK redeemable for one dQUICK
    pub dquick_to_quick: f64,
}

impl LairReads {
    fn from_raw(total_supply: U256, quick_per_dquick: U256) -> Self {
        Self {
            dquick_total_supply: whole_tokens(total_supply),
            dquick_to_quick: whole_tokens(quick_per_dquick),
        }
    }

    pub fn info(&self, one_day_volume_usd: f64, quick_price: f64) -> LairInfo {
        LairInfo {
            one_day_volume_usd,
            dquick_total_supply: self.dquick_total_supply,
            dquick_to_quick: self.dquick_to_quick,
            quick_price,
        }
    }
}

fn whole_tokens(raw: U256) -> f64 {
    let raw = BigUint::from_bytes_be(&raw.to_be_bytes::<32>());
    raw.to_f64().unwrap_or(f64::MAX) / ONE_TOKEN as f64
}

#[instrument(skip(provider))]
pub async fn read_lair<P: Provider + Clone>(provider: &P, lair: Address) -> eyre::Result<LairReads> {
    let contract = IDragonLair::new(lair, provider.clone());
    let total_supply: U256 = contract
        .totalSupply()
        .call()
        .await
        .wrap_err("failed to read dQUICK supply")?;
    let quick_per_dquick: U256 = contract
        .dQUICKForQUICK(U256::from(ONE_TOKEN))
        .call()
        .await
        .wrap_err("failed to read dQUICK exchange rate")?;
    Ok(LairReads::from_raw(total_supply, quick_per_dquick))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lair_apy_compounds_daily() {
        let apy = lair_apy(&LairInfo {
            one_day_volume_usd: 10_000_000.0,
            dquick_total_supply: 100_000.0,
            dquick_to_quick: 1.0,
            quick_price: 1_000.0,
        })
        .unwrap();
        // apr = 1e7 * 0.0004 / 1e5 * 365 / 1e3 = 0.0146
        let expected = ((1.0 + 0.0146 / 365.0f64).powi(365) - 1.0) * 100.0;
        assert!((apy - expected).abs() < 1e-9);
        assert!(lair_apy(&LairInfo { one_day_volume_usd: 0.0, dquick_total_supply: 1.0, dquick_to_quick: 1.0, quick_price: 1.0 }).is_none());
        assert!(lair_apy(&LairInfo { one_day_volume_usd: 1.0, dquick_total_supply: 0.0, dquick_to_quick: 1.0, quick_price: 1.0 }).is_none());
    }

    #[test]
    fn runaway_compounding_reports_apr() {
        let apy = lair_apy(&LairInfo {
            one_day_volume_usd: 1_000_000.0,
            dquick_total_supply: 1.0,
            dquick_to_quick: 1.0,
            quick_price: 1.0,
        })
        .unwrap();
        assert!((apy - 400.0 * 365.0 * 100.0).abs() < 1e-6);
    }

    #[test]
    fn reads_scale_raw_amounts_to_whole_tokens() {
        let reads = LairReads::from_raw(
            U256::from(2_500u64) * U256::from(ONE_TOKEN),
            U256::from(1_200_000_000_000_000_000u64),
        );
        assert_eq!(reads.dquick_total_supply, 2_500.0);
        assert!((reads.dquick_to_quick - 1.2).abs() < 1e-12);

        let info = reads.info(5_000_000.0, 40.0);
        assert_eq!(info.dquick_total_supply, 2_500.0);
        assert_eq!(info.quick_price, 40.0);
        // apr = 5e6 * 0.0004 / 2500 * 365 / (1.2 * 40) = 6.083...
        assert!(lair_apy(&info).is_some_and(|apy| apy > 100.0));
    }
}
