use alloy::primitives::Address;
use color_eyre::eyre::{self, Context as _};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;

/// Seconds in a day, used to turn per-second reward rates into daily ones.
pub const ONE_DAY_SECONDS: u64 = 86_400;

/// Width of the window searched when resolving a timestamp into a block number.
pub const BLOCK_WINDOW_SECONDS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chain: ChainConfig,

    #[serde(default)]
    pub exchange: ExchangeConfig,

    #[serde(default)]
    pub gas: GasLimits,

    /// Seconds a submitted transaction stays valid after the latest block
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Default slippage tolerance for swap summaries, in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,

    /// Hex private key of the wallet used for farm transactions
    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default)]
    pub lair: LairConfig,

    /// Staking pools listed on the farm page
    #[serde(default)]
    pub farms: Vec<FarmConfig>,
}

/// The dQUICK staking contract and the token it stakes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LairConfig {
    pub address: Address,
    pub quick_token: Address,
}

impl Default for LairConfig {
    fn default() -> Self {
        Self {
            address: alloy::primitives::address!("f28164a485b0b2c90639e47b0f377b4a438a16b1"),
            quick_token: alloy::primitives::address!("831753dd7087cac61ab5644b308642cc1c33dc13"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain name, e.g. `polygon`
    pub name: String,

    /// RPC endpoint URL
    pub rpc_url: String,

    /// GraphQL endpoint of the exchange subgraph
    pub subgraph_url: String,

    /// GraphQL endpoint of the blocks subgraph
    pub blocks_subgraph_url: String,

    /// Name the exchange subgraph is deployed under, used by the health query
    #[serde(default = "default_subgraph_name")]
    pub subgraph_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub factory_address: Address,

    /// Id of the bundle entity holding the native token's USD price
    pub bundle_id: String,

    /// Share of each trade paid to liquidity providers, in basis points
    pub lp_fee_bps: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            factory_address: alloy::primitives::address!(
                "5757371414417b8c6caad45baef941abc7d3ab32"
            ),
            bundle_id: "1".to_string(),
            lp_fee_bps: 25,
        }
    }
}

/// Gas limits sent with each staking contract call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GasLimits {
    pub stake: u64,
    pub withdraw: u64,
    pub claim: u64,
    /// Margin added on top of the estimated approval gas, in basis points
    pub approval_margin_bps: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            stake: 350_000,
            withdraw: 300_000,
            claim: 350_000,
            approval_margin_bps: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Staking rewards contract
    pub staking_address: Address,

    /// Pair whose LP token is staked
    pub pair: Address,

    /// Token the pool is valued in; defaults to the pair's first token
    #[serde(default)]
    pub base_token: Option<Address>,

    /// One entry for a single-reward farm, two for a dual-reward farm
    pub rewards: Vec<RewardConfig>,

    /// Marks retired farms whose rewards have stopped regardless of chain state
    #[serde(default)]
    pub ended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    pub token: Address,

    /// Reward tokens the whole pool emits per day
    pub rate_per_day: f64,
}

fn default_deadline_secs() -> u64 {
    1_200
}

fn default_slippage_bps() -> u64 {
    50
}

fn default_subgraph_name() -> String {
    "sameepsi/quickswap06".to_string()
}

impl Config {
    /// Load configuration from `quickdex.yaml` and `QUICKDEX_`-prefixed environment variables
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Yaml::file("quickdex.yaml"))
            .merge(Env::prefixed("QUICKDEX_").split("__"))
    }

    pub fn build_chain(&self) -> eyre::Result<Chain> {
        let ChainConfig {
            name,
            rpc_url,
            subgraph_url,
            blocks_subgraph_url,
            ..
        } = &self.chain;
        Chain::new(name, rpc_url, subgraph_url, blocks_subgraph_url)
            .wrap_err("failed to parse chain config")
    }
}
