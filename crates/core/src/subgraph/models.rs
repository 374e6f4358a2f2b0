//! Response shapes of the queries in [`super::queries`].
//!
//! The subgraph encodes `BigDecimal` and `BigInt` fields as JSON strings; [`num`] decodes
//! them into floats and integers.
use std::collections::HashMap;

use serde::Deserialize;

use super::document::SubgraphId;

pub mod num {
    use serde::{Deserialize, Deserializer, de::Error as _};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Float(f64),
    }

    pub fn f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match StrOrNum::deserialize(d)? {
            StrOrNum::Str(s) => s.trim().parse().map_err(D::Error::custom),
            StrOrNum::Float(v) => Ok(v),
        }
    }

    pub fn u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match StrOrNum::deserialize(d)? {
            StrOrNum::Str(s) => s.trim().parse().map_err(D::Error::custom),
            StrOrNum::Float(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
            StrOrNum::Float(v) => Err(D::Error::custom(format!("{v} is not an unsigned integer"))),
        }
    }

    pub fn u8<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        let v = u64(d)?;
        u8::try_from(v).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockNumber {
    #[serde(deserialize_with = "num::u64")]
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainIndexingStatus {
    pub chain_head_block: BlockNumber,
    pub latest_block: BlockNumber,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexingStatus {
    pub synced: bool,
    pub health: String,
    pub chains: Vec<ChainIndexingStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub indexing_status_for_current_version: Option<IndexingStatus>,
}

/// Token identity fields, as selected inside pairs and search results.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRef {
    pub id: SubgraphId,
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "num::u8")]
    pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSearchItem {
    pub id: SubgraphId,
    pub symbol: String,
    pub name: String,
    #[serde(deserialize_with = "num::u8")]
    pub decimals: u8,
    #[serde(deserialize_with = "num::f64")]
    pub total_liquidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSearchResponse {
    pub as_symbol: Vec<TokenSearchItem>,
    pub as_name: Vec<TokenSearchItem>,
    pub as_address: Vec<TokenSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairWithTokens {
    pub id: SubgraphId,
    pub token0: TokenRef,
    pub token1: TokenRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSearchResponse {
    pub as0: Vec<PairWithTokens>,
    pub as1: Vec<PairWithTokens>,
    pub as_address: Vec<PairWithTokens>,
}

/// The `TokenFields` fragment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenFields {
    pub id: SubgraphId,
    pub name: String,
    pub symbol: String,
    #[serde(deserialize_with = "num::u8")]
    pub decimals: u8,
    #[serde(rename = "derivedETH", deserialize_with = "num::f64")]
    pub derived_eth: f64,
    #[serde(deserialize_with = "num::f64")]
    pub trade_volume: f64,
    #[serde(rename = "tradeVolumeUSD", deserialize_with = "num::f64")]
    pub trade_volume_usd: f64,
    #[serde(rename = "untrackedVolumeUSD", deserialize_with = "num::f64")]
    pub untracked_volume_usd: f64,
    #[serde(deserialize_with = "num::f64")]
    pub total_liquidity: f64,
    #[serde(default, deserialize_with = "num::u64")]
    pub tx_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokensResponse {
    pub tokens: Vec<TokenFields>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdOnly {
    pub id: SubgraphId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairIdsResponse {
    pub pairs: Vec<IdOnly>,
}

/// Pairs holding a token as `token0` and as `token1`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairsResponse {
    pub pairs0: Vec<IdOnly>,
    pub pairs1: Vec<IdOnly>,
}

/// The `PairFields` fragment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairFields {
    pub id: SubgraphId,
    #[serde(rename = "trackedReserveETH", deserialize_with = "num::f64")]
    pub tracked_reserve_eth: f64,
    #[serde(rename = "volumeUSD", deserialize_with = "num::f64")]
    pub volume_usd: f64,
    #[serde(rename = "reserveUSD", deserialize_with = "num::f64")]
    pub reserve_usd: f64,
    #[serde(deserialize_with = "num::f64")]
    pub total_supply: f64,
    pub token0: TokenRef,
    pub token1: TokenRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairsResponse {
    pub pairs: Vec<PairFields>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPair {
    pub id: SubgraphId,
    #[serde(rename = "reserveUSD", deserialize_with = "num::f64")]
    pub reserve_usd: f64,
    #[serde(rename = "trackedReserveETH", deserialize_with = "num::f64")]
    pub tracked_reserve_eth: f64,
    #[serde(rename = "volumeUSD", deserialize_with = "num::f64")]
    pub volume_usd: f64,
    #[serde(rename = "untrackedVolumeUSD", deserialize_with = "num::f64")]
    pub untracked_volume_usd: f64,
    #[serde(deserialize_with = "num::f64")]
    pub total_supply: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalPairsResponse {
    pub pairs: Vec<HistoricalPair>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: String,
    #[serde(deserialize_with = "num::f64")]
    pub eth_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundlesResponse {
    pub bundles: Vec<Bundle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryData {
    pub id: String,
    #[serde(rename = "totalVolumeUSD", deserialize_with = "num::f64")]
    pub total_volume_usd: f64,
    #[serde(rename = "totalVolumeETH", deserialize_with = "num::f64")]
    pub total_volume_eth: f64,
    #[serde(rename = "untrackedVolumeUSD", deserialize_with = "num::f64")]
    pub untracked_volume_usd: f64,
    #[serde(rename = "totalLiquidityUSD", deserialize_with = "num::f64")]
    pub total_liquidity_usd: f64,
    #[serde(rename = "totalLiquidityETH", deserialize_with = "num::f64")]
    pub total_liquidity_eth: f64,
    #[serde(deserialize_with = "num::u64")]
    pub tx_count: u64,
    #[serde(deserialize_with = "num::u64")]
    pub pair_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoriesResponse {
    pub uniswap_factories: Vec<FactoryData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDayData {
    pub id: String,
    #[serde(deserialize_with = "num::u64")]
    pub date: u64,
    #[serde(rename = "priceUSD", deserialize_with = "num::f64")]
    pub price_usd: f64,
    #[serde(deserialize_with = "num::f64")]
    pub total_liquidity_token: f64,
    #[serde(rename = "totalLiquidityUSD", deserialize_with = "num::f64")]
    pub total_liquidity_usd: f64,
    #[serde(rename = "totalLiquidityETH", deserialize_with = "num::f64")]
    pub total_liquidity_eth: f64,
    #[serde(rename = "dailyVolumeETH", deserialize_with = "num::f64")]
    pub daily_volume_eth: f64,
    #[serde(deserialize_with = "num::f64")]
    pub daily_volume_token: f64,
    #[serde(rename = "dailyVolumeUSD", deserialize_with = "num::f64")]
    pub daily_volume_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenChartResponse {
    pub token_day_datas: Vec<TokenDayData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryDayData {
    pub id: String,
    #[serde(deserialize_with = "num::u64")]
    pub date: u64,
    #[serde(rename = "totalVolumeUSD", deserialize_with = "num::f64")]
    pub total_volume_usd: f64,
    #[serde(rename = "dailyVolumeUSD", deserialize_with = "num::f64")]
    pub daily_volume_usd: f64,
    #[serde(rename = "dailyVolumeETH", deserialize_with = "num::f64")]
    pub daily_volume_eth: f64,
    #[serde(rename = "totalLiquidityUSD", deserialize_with = "num::f64")]
    pub total_liquidity_usd: f64,
    #[serde(rename = "totalLiquidityETH", deserialize_with = "num::f64")]
    pub total_liquidity_eth: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalChartResponse {
    pub uniswap_day_datas: Vec<FactoryDayData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockData {
    pub id: String,
    #[serde(deserialize_with = "num::u64")]
    pub number: u64,
    #[serde(deserialize_with = "num::u64")]
    pub timestamp: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockResponse {
    pub blocks: Vec<BlockData>,
}

/// Response of [`super::queries::get_blocks`]: `t<timestamp>` → matching blocks.
pub type AliasedBlocks = HashMap<String, Vec<BlockNumber>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedEth {
    #[serde(rename = "derivedETH", deserialize_with = "num::f64")]
    pub derived_eth: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthPriceOnly {
    #[serde(deserialize_with = "num::f64")]
    pub eth_price: f64,
}

/// Response of [`super::queries::prices_by_block`]; either alias may be null when the
/// entity did not exist yet at that block.
pub type AliasedPrices = HashMap<String, Option<serde_json::Value>>;
