//! Derived market data: prices, 24h changes, volumes and APYs computed from pairs of
//! current and historical subgraph snapshots.
use std::collections::HashMap;

use color_eyre::eyre::{self, Context as _, OptionExt as _};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::{
    config::{BLOCK_WINDOW_SECONDS, ONE_DAY_SECONDS},
    subgraph::{
        BlockRef, Subgraph, SubgraphId,
        models::{
            AliasedBlocks, AliasedPrices, BlockResponse, BundlesResponse, DerivedEth,
            EthPriceOnly, FactoriesResponse, FactoryData, FactoryDayData, GlobalChartResponse,
            HealthResponse, HistoricalPair, HistoricalPairsResponse, PairFields,
            PairIdsResponse, PairSearchResponse, PairWithTokens, PairsResponse, TokenDayData,
            TokenChartResponse, TokenFields, TokenPairsResponse, TokenSearchItem,
            TokenSearchResponse, TokensResponse,
        },
        queries,
    },
};

/// `(now - before) / before` in percent; zero when the ratio is undefined.
pub fn get_percent_change(value_now: f64, value_before: f64) -> f64 {
    let change = (value_now - value_before) / value_before * 100.0;
    if change.is_finite() { change } else { 0.0 }
}

/// Annualized fee return of a pool, as a fraction.
pub fn one_year_fee_apy(one_day_volume_usd: f64, reserve_usd: f64, lp_fee: f64) -> f64 {
    if reserve_usd <= 0.0 {
        return 0.0;
    }
    one_day_volume_usd * lp_fee * 365.0 / reserve_usd
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EthPrice {
    pub current: f64,
    pub one_day_ago: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenStats {
    pub id: SubgraphId,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub price_usd: f64,
    pub price_change_usd: f64,
    pub one_day_volume_usd: f64,
    pub total_liquidity_usd: f64,
    pub one_day_txns: u64,
}

impl TokenStats {
    fn from_snapshots(
        now: &TokenFields,
        one_day: Option<&TokenFields>,
        eth: &EthPrice,
    ) -> Self {
        let price_usd = now.derived_eth * eth.current;
        let (price_change_usd, one_day_volume_usd, one_day_txns) = match one_day {
            Some(before) => (
                get_percent_change(price_usd, before.derived_eth * eth.one_day_ago),
                now.trade_volume_usd - before.trade_volume_usd,
                now.tx_count.saturating_sub(before.tx_count),
            ),
            None => (0.0, now.trade_volume_usd, now.tx_count),
        };
        Self {
            id: now.id.clone(),
            symbol: now.symbol.clone(),
            name: now.name.clone(),
            decimals: now.decimals,
            price_usd,
            price_change_usd,
            one_day_volume_usd,
            total_liquidity_usd: now.total_liquidity * price_usd,
            one_day_txns,
        }
    }
}

/// The first `n` of `tokens` in their given (volume) order, or `None` while fewer than
/// `n` tokens are known.
pub fn top_movers(tokens: &[TokenStats], n: usize) -> Option<Vec<&TokenStats>> {
    tokens.get(..n).map(|movers| movers.iter().collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct PairStats {
    pub id: SubgraphId,
    pub token0: String,
    pub token1: String,
    pub reserve_usd: f64,
    pub tracked_reserve_eth: f64,
    pub total_supply: f64,
    pub one_day_volume_usd: f64,
    pub one_day_fee_usd: f64,
    /// Annualized fee return, as a fraction
    pub fee_apy: f64,
    pub liquidity_change_usd: f64,
}

impl PairStats {
    fn from_snapshots(now: &PairFields, one_day: Option<&HistoricalPair>, lp_fee: f64) -> Self {
        let (one_day_volume_usd, liquidity_change_usd) = match one_day {
            Some(before) => (
                now.volume_usd - before.volume_usd,
                get_percent_change(now.reserve_usd, before.reserve_usd),
            ),
            None => (now.volume_usd, 0.0),
        };
        Self {
            id: now.id.clone(),
            token0: now.token0.symbol.clone(),
            token1: now.token1.symbol.clone(),
            reserve_usd: now.reserve_usd,
            tracked_reserve_eth: now.tracked_reserve_eth,
            total_supply: now.total_supply,
            one_day_volume_usd,
            one_day_fee_usd: one_day_volume_usd * lp_fee,
            fee_apy: one_year_fee_apy(one_day_volume_usd, now.reserve_usd, lp_fee),
            liquidity_change_usd,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub total_volume_usd: f64,
    pub total_liquidity_usd: f64,
    pub one_day_volume_usd: f64,
    pub volume_change_usd: f64,
    pub liquidity_change_usd: f64,
    pub one_day_txns: u64,
    pub txns_change: f64,
    pub pair_count: u64,
}

impl GlobalStats {
    fn from_snapshots(
        now: &FactoryData,
        one_day: Option<&FactoryData>,
        two_day: Option<&FactoryData>,
    ) -> Self {
        let volume = |d: Option<&FactoryData>| d.map_or(0.0, |d| d.total_volume_usd);
        let txs = |d: Option<&FactoryData>| d.map_or(0, |d| d.tx_count);

        let one_day_volume_usd = now.total_volume_usd - volume(one_day);
        let previous_day_volume_usd = volume(one_day) - volume(two_day);
        let one_day_txns = now.tx_count.saturating_sub(txs(one_day));
        let previous_day_txns = txs(one_day).saturating_sub(txs(two_day));

        Self {
            total_volume_usd: now.total_volume_usd,
            total_liquidity_usd: now.total_liquidity_usd,
            one_day_volume_usd,
            volume_change_usd: get_percent_change(one_day_volume_usd, previous_day_volume_usd),
            liquidity_change_usd: one_day.map_or(0.0, |d| {
                get_percent_change(now.total_liquidity_usd, d.total_liquidity_usd)
            }),
            one_day_txns,
            txns_change: get_percent_change(one_day_txns as f64, previous_day_txns as f64),
            pair_count: now.pair_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubgraphHealth {
    pub synced: bool,
    pub healthy: bool,
    pub latest_block: u64,
    pub chain_head_block: u64,
}

impl SubgraphHealth {
    pub fn lag(&self) -> u64 {
        self.chain_head_block.saturating_sub(self.latest_block)
    }
}

/// Reads and derives market data from the exchange and blocks subgraphs.
///
/// `now` is always passed in (unix seconds) so every derivation is reproducible.
#[derive(Debug, Clone)]
pub struct Analytics<S> {
    exchange: S,
    blocks: S,
    bundle_id: String,
    factory: SubgraphId,
    lp_fee: f64,
}

impl<S: Subgraph + Sync> Analytics<S> {
    pub fn new(exchange: S, blocks: S, bundle_id: &str, factory: SubgraphId, lp_fee: f64) -> Self {
        Self {
            exchange,
            blocks,
            bundle_id: bundle_id.to_string(),
            factory,
            lp_fee,
        }
    }

    pub async fn health(&self, subgraph_name: &str) -> eyre::Result<SubgraphHealth> {
        let res: HealthResponse = self
            .exchange
            .query(&queries::subgraph_health(subgraph_name), json!({}))
            .await
            .wrap_err("failed to query subgraph health")?;
        let status = res
            .indexing_status_for_current_version
            .ok_or_eyre("subgraph has no current version")?;
        let chain = status
            .chains
            .first()
            .ok_or_eyre("subgraph indexes no chain")?;
        Ok(SubgraphHealth {
            synced: status.synced,
            healthy: status.health == "healthy",
            latest_block: chain.latest_block.number,
            chain_head_block: chain.chain_head_block.number,
        })
    }

    /// Resolves each timestamp to the first block in the window after it. Timestamps
    /// without a block are skipped.
    #[instrument(skip(self))]
    pub async fn blocks_from_timestamps(&self, timestamps: &[u64]) -> eyre::Result<Vec<BlockRef>> {
        if timestamps.is_empty() {
            return Ok(Vec::new());
        }
        let res: AliasedBlocks = self
            .blocks
            .query(&queries::get_blocks(timestamps), json!({}))
            .await
            .wrap_err("failed to resolve timestamps into blocks")?;

        let mut blocks = Vec::with_capacity(timestamps.len());
        for &timestamp in timestamps {
            match res.get(&format!("t{timestamp}")).and_then(|b| b.first()) {
                Some(block) => blocks.push(BlockRef {
                    number: block.number,
                    timestamp,
                }),
                None => debug!(timestamp, "no block found for timestamp"),
            }
        }
        Ok(blocks)
    }

    /// The first block mined in the window after `timestamp`, if any.
    pub async fn block_from_timestamp(&self, timestamp: u64) -> eyre::Result<Option<u64>> {
        let res: BlockResponse = self
            .blocks
            .query(
                &queries::get_block(),
                json!({
                    "timestampFrom": timestamp,
                    "timestampTo": timestamp.saturating_add(BLOCK_WINDOW_SECONDS),
                }),
            )
            .await
            .wrap_err("failed to resolve timestamp into block")?;
        Ok(res.blocks.first().map(|b| b.number))
    }

    async fn block_one_day_before(&self, now: u64) -> eyre::Result<Option<u64>> {
        self.block_from_timestamp(now.saturating_sub(ONE_DAY_SECONDS)).await
    }

    async fn eth_price_at(&self, block: Option<u64>) -> eyre::Result<f64> {
        let res: BundlesResponse = self
            .exchange
            .query(&queries::eth_price(&self.bundle_id, block), json!({}))
            .await
            .wrap_err("failed to query bundle price")?;
        res.bundles
            .first()
            .map(|b| b.eth_price)
            .ok_or_eyre("bundle not found")
    }

    /// Current and 24h-ago price of the native token in USD.
    #[instrument(skip(self))]
    pub async fn eth_price(&self, now: u64) -> eyre::Result<EthPrice> {
        let current = self.eth_price_at(None).await?;
        let one_day_ago = match self.block_one_day_before(now).await? {
            Some(block) => self.eth_price_at(Some(block)).await?,
            None => {
                warn!("no block found 24h ago, reusing current price");
                current
            }
        };
        Ok(EthPrice {
            current,
            one_day_ago,
            change_percent: get_percent_change(current, one_day_ago),
        })
    }

    /// The `count` most traded tokens with USD prices and 24h changes.
    #[instrument(skip(self, eth))]
    pub async fn top_tokens(&self, eth: &EthPrice, now: u64, count: usize) -> eyre::Result<Vec<TokenStats>> {
        let current: TokensResponse = self
            .exchange
            .query(&queries::tokens_current(count), json!({}))
            .await
            .wrap_err("failed to query top tokens")?;

        let one_day = match self.block_one_day_before(now).await? {
            Some(block) => {
                let res: TokensResponse = self
                    .exchange
                    .query(&queries::tokens_at(Some(block), count), json!({}))
                    .await
                    .wrap_err("failed to query top tokens 24h ago")?;
                res.tokens
            }
            None => Vec::new(),
        };
        let one_day = one_day
            .iter()
            .map(|t| (t.id.clone(), t))
            .collect::<HashMap<_, _>>();

        Ok(current
            .tokens
            .iter()
            .map(|t| TokenStats::from_snapshots(t, one_day.get(&t.id).copied(), eth))
            .collect())
    }

    #[instrument(skip(self, eth))]
    pub async fn token_info(&self, eth: &EthPrice, now: u64, token: &SubgraphId) -> eyre::Result<Option<TokenStats>> {
        let current: TokensResponse = self
            .exchange
            .query(&queries::token_info(token), json!({}))
            .await
            .wrap_err("failed to query token info")?;
        let Some(now_data) = current.tokens.first() else {
            return Ok(None);
        };

        let one_day = match self.block_one_day_before(now).await? {
            Some(block) => {
                let res: TokensResponse = self
                    .exchange
                    .query(&queries::token_info_at(Some(block), token), json!({}))
                    .await
                    .wrap_err("failed to query token info 24h ago")?;
                res.tokens.into_iter().next()
            }
            None => None,
        };
        Ok(Some(TokenStats::from_snapshots(now_data, one_day.as_ref(), eth)))
    }

    /// Current state and 24h volume of each pair in `ids`.
    #[instrument(skip(self, ids), fields(pairs = ids.len()))]
    pub async fn bulk_pair_data(&self, ids: &[SubgraphId], now: u64) -> eyre::Result<Vec<PairStats>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let current: PairsResponse = self
            .exchange
            .query(&queries::pairs_bulk(ids), json!({}))
            .await
            .wrap_err("failed to query pairs")?;

        let one_day = match self.block_one_day_before(now).await? {
            Some(block) => {
                let res: HistoricalPairsResponse = self
                    .exchange
                    .query(&queries::pairs_historical_bulk(block, ids), json!({}))
                    .await
                    .wrap_err("failed to query pairs 24h ago")?;
                res.pairs
            }
            None => Vec::new(),
        };
        let one_day = one_day
            .iter()
            .map(|p| (p.id.clone(), p))
            .collect::<HashMap<_, _>>();

        Ok(current
            .pairs
            .iter()
            .map(|p| PairStats::from_snapshots(p, one_day.get(&p.id).copied(), self.lp_fee))
            .collect())
    }

    /// Current USD price of each token in `ids`. Tokens unknown to the subgraph are left out.
    #[instrument(skip(self, ids), fields(tokens = ids.len()))]
    pub async fn token_prices(&self, ids: &[SubgraphId]) -> eyre::Result<Vec<(TokenFields, f64)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let eth = self.eth_price_at(None).await?;
        let responses = try_join_all(ids.iter().map(|id| async move {
            let res: TokensResponse = self
                .exchange
                .query(&queries::token_info(id), json!({}))
                .await
                .wrap_err_with(|| format!("failed to query token {id}"))?;
            if res.tokens.is_empty() {
                debug!(%id, "token not indexed");
            }
            eyre::Ok(res.tokens)
        }))
        .await?;

        Ok(responses
            .into_iter()
            .flatten()
            .map(|token| {
                let price = token.derived_eth * eth;
                (token, price)
            })
            .collect())
    }

    /// Raw pair data including token identities, keyed by pair id.
    pub async fn pairs(&self, ids: &[SubgraphId]) -> eyre::Result<HashMap<SubgraphId, PairFields>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let res: PairsResponse = self
            .exchange
            .query(&queries::pairs_bulk(ids), json!({}))
            .await
            .wrap_err("failed to query pairs")?;
        Ok(res.pairs.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// The `count` deepest pairs by USD reserve with their 24h stats, deepest first.
    #[instrument(skip(self))]
    pub async fn top_pairs(&self, count: usize, now: u64) -> eyre::Result<Vec<PairStats>> {
        let res: PairIdsResponse = self
            .exchange
            .query(&queries::pairs_current(count), json!({}))
            .await
            .wrap_err("failed to query top pairs")?;
        let ids = res.pairs.into_iter().map(|p| p.id).collect::<Vec<_>>();

        let mut stats = self.bulk_pair_data(&ids, now).await?;
        stats.sort_by(|a, b| b.reserve_usd.total_cmp(&a.reserve_usd));
        Ok(stats)
    }

    /// Every pair containing `token` with its 24h stats, deepest first.
    #[instrument(skip(self))]
    pub async fn token_pairs(&self, token: &SubgraphId, now: u64) -> eyre::Result<Vec<PairStats>> {
        let res: TokenPairsResponse = self
            .exchange
            .query(&queries::token_pairs(token), json!({}))
            .await
            .wrap_err("failed to query token pairs")?;
        let mut ids = res
            .pairs0
            .into_iter()
            .chain(res.pairs1)
            .map(|p| p.id)
            .collect::<Vec<_>>();
        ids.sort();
        ids.dedup();

        let mut stats = self.bulk_pair_data(&ids, now).await?;
        stats.sort_by(|a, b| b.reserve_usd.total_cmp(&a.reserve_usd));
        Ok(stats)
    }

    /// Exchange-wide totals and their 24h changes.
    #[instrument(skip(self))]
    pub async fn global_data(&self, now: u64) -> eyre::Result<GlobalStats> {
        let blocks = self
            .blocks_from_timestamps(&[
                now.saturating_sub(ONE_DAY_SECONDS),
                now.saturating_sub(2 * ONE_DAY_SECONDS),
            ])
            .await?;
        let block_at = |ts: u64| blocks.iter().find(|b| b.timestamp == ts).map(|b| b.number);

        let current = self.factory_at(None).await?.ok_or_eyre("factory not found")?;
        let one_day = match block_at(now.saturating_sub(ONE_DAY_SECONDS)) {
            Some(block) => self.factory_at(Some(block)).await?,
            None => None,
        };
        let two_day = match block_at(now.saturating_sub(2 * ONE_DAY_SECONDS)) {
            Some(block) => self.factory_at(Some(block)).await?,
            None => None,
        };
        Ok(GlobalStats::from_snapshots(
            &current,
            one_day.as_ref(),
            two_day.as_ref(),
        ))
    }

    async fn factory_at(&self, block: Option<u64>) -> eyre::Result<Option<FactoryData>> {
        let res: FactoriesResponse = self
            .exchange
            .query(&queries::global_data(&self.factory, block), json!({}))
            .await
            .wrap_err("failed to query factory totals")?;
        Ok(res.uniswap_factories.into_iter().next())
    }

    /// Tokens whose symbol or name contains `text`, or whose id is `text`, deepest first
    /// and without duplicates.
    pub async fn search_tokens(&self, text: &str) -> eyre::Result<Vec<TokenSearchItem>> {
        let id = SubgraphId::parse(text).map(String::from).unwrap_or_default();
        let res: TokenSearchResponse = self
            .exchange
            .query(
                &queries::token_search(),
                json!({ "value": text.to_uppercase(), "id": id }),
            )
            .await
            .wrap_err("failed to search tokens")?;

        let mut seen = std::collections::HashSet::new();
        let mut found = res
            .as_address
            .into_iter()
            .chain(res.as_symbol)
            .chain(res.as_name)
            .filter(|t| seen.insert(t.id.clone()))
            .collect::<Vec<_>>();
        found.sort_by(|a, b| b.total_liquidity.total_cmp(&a.total_liquidity));
        Ok(found)
    }

    /// Pairs containing any of `tokens`, or with id `pair`, without duplicates.
    pub async fn search_pairs(
        &self,
        tokens: &[SubgraphId],
        pair: Option<&SubgraphId>,
    ) -> eyre::Result<Vec<PairWithTokens>> {
        let res: PairSearchResponse = self
            .exchange
            .query(
                &queries::pair_search(),
                json!({
                    "tokens": tokens.iter().map(SubgraphId::as_str).collect::<Vec<_>>(),
                    "id": pair.map(SubgraphId::as_str).unwrap_or_default(),
                }),
            )
            .await
            .wrap_err("failed to search pairs")?;

        let mut seen = std::collections::HashSet::new();
        Ok(res
            .as_address
            .into_iter()
            .chain(res.as0)
            .chain(res.as1)
            .filter(|p| seen.insert(p.id.clone()))
            .collect())
    }

    /// Daily exchange-wide volume and liquidity after `start_time`, oldest first,
    /// fetched page by page.
    #[instrument(skip(self))]
    pub async fn global_chart(&self, start_time: u64) -> eyre::Result<Vec<FactoryDayData>> {
        let mut days = Vec::new();
        loop {
            let res: GlobalChartResponse = self
                .exchange
                .query(
                    &queries::global_chart(),
                    json!({ "startTime": start_time, "skip": days.len() }),
                )
                .await
                .wrap_err("failed to query global chart")?;
            let page = res.uniswap_day_datas.len();
            days.extend(res.uniswap_day_datas);
            if page < queries::CHART_PAGE_SIZE {
                break;
            }
        }
        debug!(days = days.len(), "fetched global chart");
        Ok(days)
    }

    /// Daily snapshots of `token` since `start_time`, newest first.
    pub async fn token_chart(&self, token: &SubgraphId, start_time: u64) -> eyre::Result<Vec<TokenDayData>> {
        let res: TokenChartResponse = self
            .exchange
            .query(
                &queries::token_chart(),
                json!({ "tokenAddr": token.as_str(), "startTime": start_time }),
            )
            .await
            .wrap_err("failed to query token chart")?;
        Ok(res.token_day_datas)
    }

    /// USD price of `token` at each of `timestamps`, in one round trip per subgraph.
    /// Timestamps at which the token or bundle did not exist are skipped.
    #[instrument(skip(self, timestamps), fields(points = timestamps.len()))]
    pub async fn price_history(&self, token: &SubgraphId, timestamps: &[u64]) -> eyre::Result<Vec<(u64, f64)>> {
        let blocks = self.blocks_from_timestamps(timestamps).await?;
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        let res: AliasedPrices = self
            .exchange
            .query(&queries::prices_by_block(token, &blocks, &self.bundle_id), json!({}))
            .await
            .wrap_err("failed to query prices by block")?;

        let mut prices = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let token_entry = res.get(&format!("t{}", block.timestamp)).cloned().flatten();
            let bundle_entry = res.get(&format!("b{}", block.timestamp)).cloned().flatten();
            let (Some(token_entry), Some(bundle_entry)) = (token_entry, bundle_entry) else {
                continue;
            };
            let derived: DerivedEth = serde_json::from_value(token_entry)
                .wrap_err("failed to decode token price")?;
            let bundle: EthPriceOnly = serde_json::from_value(bundle_entry)
                .wrap_err("failed to decode bundle price")?;
            prices.push((block.timestamp, derived.derived_eth * bundle.eth_price));
        }
        Ok(prices)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::subgraph::{Document, SubgraphError};
    use proptest::prelude::*;
    use serde::de::DeserializeOwned;
    use std::sync::Mutex;

    /// Answers queries from canned JSON, picking the first entry whose needle occurs in
    /// the rendered document.
    #[derive(Default)]
    pub(crate) struct CannedSubgraph {
        responses: Vec<(String, serde_json::Value)>,
        pub(crate) seen: Mutex<Vec<String>>,
    }

    impl CannedSubgraph {
        pub(crate) fn with(mut self, needle: &str, response: serde_json::Value) -> Self {
            self.responses.push((needle.to_string(), response));
            self
        }
    }

    impl Subgraph for CannedSubgraph {
        async fn query<T: DeserializeOwned + Send>(
            &self,
            document: &Document,
            _variables: serde_json::Value,
        ) -> Result<T, SubgraphError> {
            let text = document.render();
            self.seen.lock().unwrap().push(text.clone());
            let (_, response) = self
                .responses
                .iter()
                .find(|(needle, _)| text.contains(needle.as_str()))
                .unwrap_or_else(|| panic!("no canned response for:\n{text}"));
            Ok(serde_json::from_value(response.clone())?)
        }
    }

    const NOW: u64 = 1_700_000_000;

    fn addr(last: u8) -> String {
        format!("0x{:040x}", last)
    }

    fn token_json(last: u8, symbol: &str, derived_eth: &str, volume: &str, txs: &str) -> serde_json::Value {
        json!({
            "id": addr(last), "name": symbol, "symbol": symbol, "decimals": "18",
            "derivedETH": derived_eth, "tradeVolume": "0", "tradeVolumeUSD": volume,
            "untrackedVolumeUSD": "0", "totalLiquidity": "1000", "txCount": txs
        })
    }

    fn analytics(exchange: CannedSubgraph, blocks: CannedSubgraph) -> Analytics<CannedSubgraph> {
        let factory = SubgraphId::parse(&addr(0xff)).unwrap();
        Analytics::new(exchange, blocks, "1", factory, 0.0025)
    }

    fn blocks_one_day_ago() -> CannedSubgraph {
        CannedSubgraph::default().with(
            "$timestampFrom",
            json!({ "blocks": [{ "id": "0xb1", "number": "500", "timestamp": "1699913602" }] }),
        )
    }

    #[test]
    fn percent_change_handles_zero_base() {
        assert!((get_percent_change(110.0, 100.0) - 10.0).abs() < 1e-9);
        assert!((get_percent_change(50.0, 100.0) + 50.0).abs() < 1e-9);
        assert_eq!(get_percent_change(5.0, 0.0), 0.0);
        assert_eq!(get_percent_change(0.0, 0.0), 0.0);
    }

    #[tokio::test]
    async fn eth_price_compares_against_block_one_day_ago() {
        let exchange = CannedSubgraph::default()
            .with("block: {number: 500}", json!({ "bundles": [{ "id": "1", "ethPrice": "1.6" }] }))
            .with("bundles(where: {id: \"1\"})", json!({ "bundles": [{ "id": "1", "ethPrice": "2" }] }));
        let price = analytics(exchange, blocks_one_day_ago()).eth_price(NOW).await.unwrap();
        assert_eq!(price.current, 2.0);
        assert_eq!(price.one_day_ago, 1.6);
        assert!((price.change_percent - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn token_prices_skip_unindexed_tokens() {
        let exchange = CannedSubgraph::default()
            .with("bundles(", json!({ "bundles": [{ "id": "1", "ethPrice": "2" }] }))
            .with(&addr(1), json!({ "tokens": [token_json(1, "QUICK", "30", "0", "0")] }))
            .with(&addr(2), json!({ "tokens": [] }));
        let ids = [SubgraphId::parse(&addr(1)).unwrap(), SubgraphId::parse(&addr(2)).unwrap()];

        let prices = analytics(exchange, CannedSubgraph::default())
            .token_prices(&ids)
            .await
            .unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].0.symbol, "QUICK");
        assert_eq!(prices[0].1, 60.0);
    }

    #[tokio::test]
    async fn top_tokens_derive_usd_prices_and_changes() {
        let exchange = CannedSubgraph::default()
            .with(
                "block: {number: 500}",
                json!({ "tokens": [token_json(1, "QUICK", "50", "1000", "10")] }),
            )
            .with(
                "tokens(first: 2",
                json!({ "tokens": [
                    token_json(1, "QUICK", "60", "1500", "25"),
                    token_json(2, "NEW", "1", "10", "3"),
                ] }),
            );
        let eth = EthPrice { current: 2.0, one_day_ago: 2.0, change_percent: 0.0 };
        let tokens = analytics(exchange, blocks_one_day_ago())
            .top_tokens(&eth, NOW, 2)
            .await
            .unwrap();

        assert_eq!(tokens[0].price_usd, 120.0);
        assert!((tokens[0].price_change_usd - 20.0).abs() < 1e-9);
        assert_eq!(tokens[0].one_day_volume_usd, 500.0);
        assert_eq!(tokens[0].one_day_txns, 15);
        // no snapshot a day ago: no change, whole volume counts
        assert_eq!(tokens[1].price_change_usd, 0.0);
        assert_eq!(tokens[1].one_day_volume_usd, 10.0);
    }

    #[tokio::test]
    async fn bulk_pair_data_computes_fee_apy() {
        let pair = |volume: &str| json!({
            "id": addr(9), "trackedReserveETH": "100", "volumeUSD": volume,
            "reserveUSD": "365000", "totalSupply": "10",
            "token0": { "id": addr(1), "symbol": "A", "decimals": "18" },
            "token1": { "id": addr(2), "symbol": "B", "decimals": "6" }
        });
        let exchange = CannedSubgraph::default()
            .with(
                "block: {number: 500}",
                json!({ "pairs": [{
                    "id": addr(9), "reserveUSD": "300000", "trackedReserveETH": "90",
                    "volumeUSD": "1000", "untrackedVolumeUSD": "0", "totalSupply": "10"
                }] }),
            )
            .with("...PairFields", json!({ "pairs": [pair("5000")] }));
        let ids = [SubgraphId::parse(&addr(9)).unwrap()];
        let stats = analytics(exchange, blocks_one_day_ago())
            .bulk_pair_data(&ids, NOW)
            .await
            .unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].one_day_volume_usd, 4000.0);
        assert!((stats[0].one_day_fee_usd - 10.0).abs() < 1e-9);
        // 4000 * 0.0025 * 365 / 365000
        assert!((stats[0].fee_apy - 0.01).abs() < 1e-12);
    }

    #[tokio::test]
    async fn bulk_pair_data_with_no_ids_makes_no_requests() {
        let exchange = CannedSubgraph::default();
        let a = analytics(exchange, CannedSubgraph::default());
        assert!(a.bulk_pair_data(&[], NOW).await.unwrap().is_empty());
        assert!(a.exchange.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn eth_price_reuses_current_price_without_block_one_day_ago() {
        let exchange = CannedSubgraph::default()
            .with("bundles(", json!({ "bundles": [{ "id": "1", "ethPrice": "2" }] }));
        let blocks = CannedSubgraph::default().with("$timestampFrom", json!({ "blocks": [] }));

        let price = analytics(exchange, blocks).eth_price(NOW).await.unwrap();

        assert_eq!(price.one_day_ago, 2.0);
        assert_eq!(price.change_percent, 0.0);
    }

    #[tokio::test]
    async fn block_from_timestamp_picks_first_block_in_window() {
        let blocks = CannedSubgraph::default().with(
            "timestamp_gt: $timestampFrom",
            json!({ "blocks": [
                { "id": "0xb1", "number": "41", "timestamp": "101" },
                { "id": "0xb2", "number": "42", "timestamp": "103" }
            ] }),
        );
        let a = analytics(CannedSubgraph::default(), blocks);
        assert_eq!(a.block_from_timestamp(100).await.unwrap(), Some(41));
        assert_eq!(a.block_from_timestamp(u64::MAX).await.unwrap(), Some(41));
    }

    #[tokio::test]
    async fn top_pairs_resolve_ids_then_sort_by_reserve() {
        let pair = |last: u8, reserve: &str| json!({
            "id": addr(last), "trackedReserveETH": "1", "volumeUSD": "0",
            "reserveUSD": reserve, "totalSupply": "1",
            "token0": { "id": addr(1), "symbol": "A", "decimals": "18" },
            "token1": { "id": addr(2), "symbol": "B", "decimals": "18" }
        });
        let exchange = CannedSubgraph::default()
            .with("...PairFields", json!({ "pairs": [pair(8, "10"), pair(9, "20")] }))
            .with("block: {number: 500}", json!({ "pairs": [] }))
            .with(
                "orderBy: reserveUSD",
                json!({ "pairs": [{ "id": addr(9) }, { "id": addr(8) }] }),
            );

        let pairs = analytics(exchange, blocks_one_day_ago())
            .top_pairs(2, NOW)
            .await
            .unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].id, SubgraphId::parse(&addr(9)).unwrap());
        assert_eq!(pairs[0].reserve_usd, 20.0);
    }

    #[tokio::test]
    async fn token_pairs_merge_both_sides() {
        let pair = |last: u8, reserve: &str| json!({
            "id": addr(last), "trackedReserveETH": "1", "volumeUSD": "0",
            "reserveUSD": reserve, "totalSupply": "1",
            "token0": { "id": addr(1), "symbol": "A", "decimals": "18" },
            "token1": { "id": addr(2), "symbol": "B", "decimals": "18" }
        });
        let exchange = CannedSubgraph::default()
            .with("...PairFields", json!({ "pairs": [pair(7, "5"), pair(8, "50")] }))
            .with("block: {number: 500}", json!({ "pairs": [] }))
            .with(
                "pairs0: pairs",
                json!({
                    "pairs0": [{ "id": addr(7) }],
                    "pairs1": [{ "id": addr(8) }, { "id": addr(7) }]
                }),
            );
        let a = analytics(exchange, blocks_one_day_ago());

        let pairs = a.token_pairs(&SubgraphId::parse(&addr(1)).unwrap(), NOW).await.unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].id, SubgraphId::parse(&addr(8)).unwrap());
        let seen = a.exchange.seen.lock().unwrap();
        let bulk = seen.iter().find(|q| q.contains("...PairFields")).unwrap();
        assert!(bulk.contains("first: 2"));
    }

    #[tokio::test]
    async fn global_chart_stops_after_short_page() {
        let exchange = CannedSubgraph::default().with(
            "uniswapDayDatas",
            json!({ "uniswapDayDatas": [
                {
                    "id": "19000", "date": "1641600000", "totalVolumeUSD": "100",
                    "dailyVolumeUSD": "10", "dailyVolumeETH": "5",
                    "totalLiquidityUSD": "1000", "totalLiquidityETH": "500"
                },
                {
                    "id": "19001", "date": "1641686400", "totalVolumeUSD": "130",
                    "dailyVolumeUSD": "30", "dailyVolumeETH": "15",
                    "totalLiquidityUSD": "1100", "totalLiquidityETH": "550"
                }
            ] }),
        );
        let a = analytics(exchange, CannedSubgraph::default());

        let days = a.global_chart(1_641_500_000).await.unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[1].daily_volume_usd, 30.0);
        assert_eq!(a.exchange.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn global_data_differences_factory_snapshots() {
        let factory = |volume: &str, liquidity: &str, txs: &str| json!({ "uniswapFactories": [{
            "id": addr(0xff), "totalVolumeUSD": volume, "totalVolumeETH": "0",
            "untrackedVolumeUSD": "0", "totalLiquidityUSD": liquidity,
            "totalLiquidityETH": "0", "txCount": txs, "pairCount": "77"
        }] });
        let blocks = CannedSubgraph::default().with(
            "t1699913600",
            json!({
                "t1699913600": [{ "number": "500" }],
                "t1699827200": [{ "number": "400" }]
            }),
        );
        let exchange = CannedSubgraph::default()
            .with("block: {number: 500}", factory("900", "100", "90"))
            .with("block: {number: 400}", factory("850", "100", "85"))
            .with("uniswapFactories", factory("1000", "110", "100"));

        let stats = analytics(exchange, blocks).global_data(NOW).await.unwrap();
        assert_eq!(stats.one_day_volume_usd, 100.0);
        assert!((stats.volume_change_usd - 100.0).abs() < 1e-9);
        assert_eq!(stats.one_day_txns, 10);
        assert!((stats.liquidity_change_usd - 10.0).abs() < 1e-9);
        assert_eq!(stats.pair_count, 77);
    }

    #[tokio::test]
    async fn price_history_skips_missing_entities() {
        let blocks = CannedSubgraph::default().with(
            "blocks",
            json!({ "t100": [{ "number": "1" }], "t200": [{ "number": "2" }] }),
        );
        let exchange = CannedSubgraph::default().with(
            "t100: token",
            json!({
                "t100": null,
                "b100": { "ethPrice": "2" },
                "t200": { "derivedETH": "3" },
                "b200": { "ethPrice": "2" }
            }),
        );
        let token = SubgraphId::parse(&addr(1)).unwrap();
        let prices = analytics(exchange, blocks)
            .price_history(&token, &[100, 200])
            .await
            .unwrap();
        assert_eq!(prices, vec![(200, 6.0)]);
    }

    #[tokio::test]
    async fn search_tokens_deduplicates_and_sorts_by_liquidity() {
        let item = |last: u8, sym: &str, liq: &str| json!({
            "id": addr(last), "symbol": sym, "name": sym, "decimals": "18", "totalLiquidity": liq
        });
        let exchange = CannedSubgraph::default().with(
            "asSymbol",
            json!({
                "asSymbol": [item(1, "QUICK", "10"), item(2, "QUICKER", "50")],
                "asName": [item(1, "QUICK", "10")],
                "asAddress": []
            }),
        );
        let found = analytics(exchange, CannedSubgraph::default())
            .search_tokens("quick")
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].symbol, "QUICKER");
    }

    #[tokio::test]
    async fn health_reports_lag() {
        let exchange = CannedSubgraph::default().with(
            "indexingStatusForCurrentVersion",
            json!({ "indexingStatusForCurrentVersion": {
                "synced": true, "health": "healthy",
                "chains": [{ "chainHeadBlock": { "number": "110" }, "latestBlock": { "number": "100" } }]
            } }),
        );
        let health = analytics(exchange, CannedSubgraph::default())
            .health("sameepsi/quickswap06")
            .await
            .unwrap();
        assert!(health.synced && health.healthy);
        assert_eq!(health.lag(), 10);
    }

    fn stats(symbol: &str, change: f64) -> TokenStats {
        TokenStats {
            id: SubgraphId::parse(&addr(1)).unwrap(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals: 18,
            price_usd: 1.0,
            price_change_usd: change,
            one_day_volume_usd: 0.0,
            total_liquidity_usd: 0.0,
            one_day_txns: 0,
        }
    }

    #[test]
    fn top_movers_waits_for_enough_tokens() {
        let tokens = vec![stats("A", 1.0), stats("B", -9.0), stats("C", 3.0)];
        assert!(top_movers(&tokens, 5).is_none());
        let movers = top_movers(&tokens, 2).unwrap();
        assert_eq!(movers.iter().map(|t| t.symbol.as_str()).collect::<Vec<_>>(), ["A", "B"]);
    }

    proptest! {
        #[test]
        fn top_movers_keep_volume_order(changes in proptest::collection::vec(-1000.0f64..1000.0, 5..20)) {
            let tokens = changes
                .iter()
                .enumerate()
                .map(|(i, c)| stats(&format!("T{i}"), *c))
                .collect::<Vec<_>>();
            let movers = top_movers(&tokens, 5).unwrap();
            prop_assert_eq!(movers.len(), 5);
            for (mover, token) in movers.iter().zip(&tokens) {
                prop_assert_eq!(&mover.symbol, &token.symbol);
            }
        }
    }
}
