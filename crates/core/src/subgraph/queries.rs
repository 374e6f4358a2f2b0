//! Query documents sent to the exchange and blocks subgraphs.
use super::document::{Document, Field, Fragment, SubgraphId, Value};
use crate::config::BLOCK_WINDOW_SECONDS;

const PAIR_FIELDS: &str = "PairFields";
const TOKEN_FIELDS: &str = "TokenFields";

fn pair_fields() -> Fragment {
    Fragment::new(PAIR_FIELDS, "Pair")
        .select(["id", "trackedReserveETH", "volumeUSD", "reserveUSD", "totalSupply"])
        .field(Field::new("token0").select(["symbol", "id", "decimals"]))
        .field(Field::new("token1").select(["symbol", "id", "decimals"]))
}

fn token_fields() -> Fragment {
    Fragment::new(TOKEN_FIELDS, "Token").select([
        "id",
        "name",
        "symbol",
        "decimals",
        "derivedETH",
        "tradeVolume",
        "tradeVolumeUSD",
        "untrackedVolumeUSD",
        "totalLiquidity",
        "txCount",
    ])
}

fn token_ref(name: &'static str) -> Field {
    Field::new(name).select(["id", "symbol", "name", "decimals"])
}

fn pair_with_tokens(pairs: Field) -> Field {
    pairs
        .select(["id"])
        .field(token_ref("token0"))
        .field(token_ref("token1"))
}

fn where_id_in(ids: &[SubgraphId]) -> Value {
    Value::object([("id_in", Value::ids(ids))])
}

/// Indexing status of the deployed exchange subgraph.
pub fn subgraph_health(subgraph_name: &str) -> Document {
    Document::query("health").field(
        Field::new("indexingStatusForCurrentVersion")
            .arg("subgraphName", subgraph_name)
            .select(["synced", "health"])
            .field(
                Field::new("chains")
                    .field(Field::new("chainHeadBlock").select(["number"]))
                    .field(Field::new("latestBlock").select(["number"])),
            ),
    )
}

/// Tokens matching `$value` by symbol or name, or exactly `$id`.
pub fn token_search() -> Document {
    let by = |alias: &'static str, filter: Value| {
        Field::new("tokens")
            .alias(alias)
            .arg("where", filter)
            .order_by("totalLiquidity", "desc")
            .select(["id", "symbol", "name", "decimals", "totalLiquidity"])
    };
    Document::query("tokens")
        .variable("value", "String")
        .variable("id", "String")
        .field(by(
            "asSymbol",
            Value::object([("symbol_contains", Value::Variable("value"))]),
        ))
        .field(by(
            "asName",
            Value::object([("name_contains", Value::Variable("value"))]),
        ))
        .field(by("asAddress", Value::object([("id", Value::Variable("id"))])))
}

/// Pairs containing any of `$tokens` on either side, or exactly `$id`.
pub fn pair_search() -> Document {
    let by = |alias: &'static str, filter: Value| {
        pair_with_tokens(Field::new("pairs").alias(alias).arg("where", filter))
    };
    Document::query("pairs")
        .variable("tokens", "[Bytes]!")
        .variable("id", "String")
        .field(by("as0", Value::object([("token0_in", Value::Variable("tokens"))])))
        .field(by("as1", Value::object([("token1_in", Value::Variable("tokens"))])))
        .field(by("asAddress", Value::object([("id", Value::Variable("id"))])))
}

/// Daily snapshots of `$tokenAddr` after `$startTime`, newest first.
pub fn token_chart() -> Document {
    Document::query("tokenDayDatas")
        .variable("tokenAddr", "String!")
        .variable("startTime", "Int!")
        .field(
            Field::new("tokenDayDatas")
                .arg("first", 1000u64)
                .order_by("date", "desc")
                .arg(
                    "where",
                    Value::object([
                        ("token", Value::Variable("tokenAddr")),
                        ("date_gt", Value::Variable("startTime")),
                    ]),
                )
                .select([
                    "id",
                    "date",
                    "priceUSD",
                    "totalLiquidityToken",
                    "totalLiquidityUSD",
                    "totalLiquidityETH",
                    "dailyVolumeETH",
                    "dailyVolumeToken",
                    "dailyVolumeUSD",
                ]),
        )
}

/// Ids of the `count` deepest pairs.
pub fn pairs_current(count: usize) -> Document {
    Document::query("pairs").field(
        Field::new("pairs")
            .arg("first", count)
            .order_by("reserveUSD", "desc")
            .select(["id"]),
    )
}

/// Current state of every pair in `ids`; one `id_in` entry per id.
pub fn pairs_bulk(ids: &[SubgraphId]) -> Document {
    Document::query("pairs").fragment(pair_fields()).field(
        Field::new("pairs")
            .arg("first", ids.len())
            .arg("where", where_id_in(ids))
            .order_by("trackedReserveETH", "desc")
            .spread(PAIR_FIELDS),
    )
}

/// Like [`pairs_bulk`] but with the id list passed as `$allPairs`.
pub fn pairs_bulk_by_variable() -> Document {
    Document::query("pairs")
        .variable("allPairs", "[Bytes]!")
        .fragment(pair_fields())
        .field(
            Field::new("pairs")
                .arg("first", 500u64)
                .arg("where", Value::object([("id_in", Value::Variable("allPairs"))]))
                .order_by("trackedReserveETH", "desc")
                .spread(PAIR_FIELDS),
        )
}

/// A page of ten tokens starting at `$skip`.
pub fn all_tokens() -> Document {
    Document::query("tokens").variable("skip", "Int!").field(
        Field::new("tokens")
            .arg("first", 10u64)
            .arg("skip", Value::Variable("skip"))
            .select(["id", "name", "symbol", "decimals", "totalLiquidity"]),
    )
}

/// A page of ten pairs starting at `$skip`, deepest first.
pub fn all_pairs() -> Document {
    Document::query("pairs").variable("skip", "Int!").field(pair_with_tokens(
        Field::new("pairs")
            .arg("first", 10u64)
            .arg("skip", Value::Variable("skip"))
            .order_by("trackedReserveETH", "desc"),
    ))
}

/// The `count` most traded tokens, optionally as of `block`.
pub fn tokens_at(block: Option<u64>, count: usize) -> Document {
    Document::query("tokens").fragment(token_fields()).field(
        Field::new("tokens")
            .at_block(block)
            .arg("first", count)
            .order_by("tradeVolumeUSD", "desc")
            .spread(TOKEN_FIELDS),
    )
}

pub fn tokens_current(count: usize) -> Document {
    tokens_at(None, count)
}

/// A single token, optionally as of `block`.
pub fn token_info_at(block: Option<u64>, token: &SubgraphId) -> Document {
    Document::query("tokens").fragment(token_fields()).field(
        Field::new("tokens")
            .at_block(block)
            .arg("first", 1u64)
            .arg("where", Value::object([("id", token.into())]))
            .spread(TOKEN_FIELDS),
    )
}

pub fn token_info(token: &SubgraphId) -> Document {
    token_info_at(None, token)
}

/// A token together with the ids of the 50 deepest pairs on each side of it.
pub fn token_data(token: &SubgraphId, block: Option<u64>) -> Document {
    let side = |alias: &'static str, key: &'static str| {
        Field::new("pairs")
            .alias(alias)
            .arg("where", Value::object([(key, token.into())]))
            .arg("first", 50u64)
            .order_by("reserveUSD", "desc")
            .select(["id"])
    };
    Document::query("tokens")
        .fragment(token_fields())
        .field(
            Field::new("tokens")
                .at_block(block)
                .arg("where", Value::object([("id", token.into())]))
                .spread(TOKEN_FIELDS),
        )
        .field(side("pairs0", "token0"))
        .field(side("pairs1", "token1"))
}

/// Pair ids useful for routing between `token_a` and `token_b`: the direct pair and
/// the two deepest pairs of each token that do not involve the other.
pub fn token_pair_candidates(token_a: &SubgraphId, token_b: &SubgraphId) -> Document {
    let deepest = |alias: &'static str, filter: Value| {
        Field::new("pairs")
            .alias(alias)
            .arg("where", filter)
            .arg("first", 2u64)
            .order_by("reserveUSD", "desc")
            .select(["id"])
    };
    Document::query("tokens")
        .field(
            Field::new("pairs")
                .alias("pairs0")
                .arg(
                    "where",
                    Value::object([("token0", token_a.into()), ("token1", token_b.into())]),
                )
                .select(["id"]),
        )
        .field(deepest(
            "pairs1",
            Value::object([("token0", token_a.into()), ("token1_not", token_b.into())]),
        ))
        .field(deepest(
            "pairs2",
            Value::object([("token1", token_a.into()), ("token0_not", token_b.into())]),
        ))
        .field(deepest(
            "pairs3",
            Value::object([("token0", token_b.into()), ("token1_not", token_a.into())]),
        ))
        .field(deepest(
            "pairs4",
            Value::object([("token1", token_b.into()), ("token0_not", token_a.into())]),
        ))
}

/// Ids of the 100 deepest pairs on each side of `token`.
pub fn token_pairs(token: &SubgraphId) -> Document {
    let side = |alias: &'static str, key: &'static str| {
        Field::new("pairs")
            .alias(alias)
            .arg("where", Value::object([(key, token.into())]))
            .arg("first", 100u64)
            .order_by("reserveUSD", "desc")
            .select(["id"])
    };
    Document::query("tokens")
        .field(side("pairs0", "token0"))
        .field(side("pairs1", "token1"))
}

pub fn pair_data(pair: &SubgraphId, block: Option<u64>) -> Document {
    Document::query("pairs").fragment(pair_fields()).field(
        Field::new("pairs")
            .at_block(block)
            .arg("where", Value::object([("id", pair.into())]))
            .spread(PAIR_FIELDS),
    )
}

/// Native token price in USD, optionally as of `block`.
pub fn eth_price(bundle_id: &str, block: Option<u64>) -> Document {
    Document::query("bundles").field(
        Field::new("bundles")
            .arg("where", Value::object([("id", Value::from(bundle_id))]))
            .at_block(block)
            .select(["id", "ethPrice"]),
    )
}

/// State of every pair in `ids` as of `block`.
pub fn pairs_historical_bulk(block: u64, ids: &[SubgraphId]) -> Document {
    Document::query("pairs").field(
        Field::new("pairs")
            .arg("first", ids.len())
            .arg("where", where_id_in(ids))
            .at_block(Some(block))
            .order_by("trackedReserveETH", "desc")
            .select([
                "id",
                "reserveUSD",
                "trackedReserveETH",
                "volumeUSD",
                "untrackedVolumeUSD",
                "totalSupply",
            ]),
    )
}

/// A block number and its timestamp, as returned by the blocks subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub number: u64,
    pub timestamp: u64,
}

/// `token`'s ETH price and the bundle's ETH/USD price at each block, aliased
/// `t<timestamp>` and `b<timestamp>`.
pub fn prices_by_block(token: &SubgraphId, blocks: &[BlockRef], bundle_id: &str) -> Document {
    let token_fields = blocks.iter().map(|block| {
        Field::new("token")
            .alias(format!("t{}", block.timestamp))
            .arg("id", token)
            .at_block(Some(block.number))
            .select(["derivedETH"])
    });
    let bundle_fields = blocks.iter().map(|block| {
        Field::new("bundle")
            .alias(format!("b{}", block.timestamp))
            .arg("id", bundle_id)
            .at_block(Some(block.number))
            .select(["ethPrice"])
    });
    Document::query("blocks")
        .fields(token_fields)
        .fields(bundle_fields)
}

/// Factory-wide totals, optionally as of `block`.
pub fn global_data(factory: &SubgraphId, block: Option<u64>) -> Document {
    Document::query("uniswapFactories").field(
        Field::new("uniswapFactories")
            .at_block(block)
            .arg("where", Value::object([("id", factory.into())]))
            .select([
                "id",
                "totalVolumeUSD",
                "totalVolumeETH",
                "untrackedVolumeUSD",
                "totalLiquidityUSD",
                "totalLiquidityETH",
                "txCount",
                "pairCount",
            ]),
    )
}

/// Number of daily snapshots returned per [`global_chart`] page.
pub const CHART_PAGE_SIZE: usize = 500;

/// Up to [`CHART_PAGE_SIZE`] daily factory snapshots after `$startTime`, oldest first.
pub fn global_chart() -> Document {
    Document::query("uniswapDayDatas")
        .variable("startTime", "Int!")
        .variable("skip", "Int!")
        .field(
            Field::new("uniswapDayDatas")
                .arg("first", CHART_PAGE_SIZE)
                .arg("skip", Value::Variable("skip"))
                .arg(
                    "where",
                    Value::object([("date_gt", Value::Variable("startTime"))]),
                )
                .order_by("date", "asc")
                .select([
                    "id",
                    "date",
                    "totalVolumeUSD",
                    "dailyVolumeUSD",
                    "dailyVolumeETH",
                    "totalLiquidityUSD",
                    "totalLiquidityETH",
                ]),
        )
}

/// The first block strictly between `$timestampFrom` and `$timestampTo`.
pub fn get_block() -> Document {
    Document::query("blocks")
        .variable("timestampFrom", "Int!")
        .variable("timestampTo", "Int!")
        .field(
            Field::new("blocks")
                .arg("first", 1u64)
                .order_by("timestamp", "asc")
                .arg(
                    "where",
                    Value::object([
                        ("timestamp_gt", Value::Variable("timestampFrom")),
                        ("timestamp_lt", Value::Variable("timestampTo")),
                    ]),
                )
                .select(["id", "number", "timestamp"]),
        )
}

/// One aliased `t<timestamp>` block lookup per timestamp, each searching the
/// [`BLOCK_WINDOW_SECONDS`] after it.
pub fn get_blocks(timestamps: &[u64]) -> Document {
    Document::query("blocks").fields(timestamps.iter().map(|&timestamp| {
        Field::new("blocks")
            .alias(format!("t{timestamp}"))
            .arg("first", 1u64)
            .order_by("timestamp", "desc")
            .arg(
                "where",
                Value::object([
                    ("timestamp_gt", Value::from(timestamp)),
                    ("timestamp_lt", Value::from(timestamp.saturating_add(BLOCK_WINDOW_SECONDS))),
                ]),
            )
            .select(["number"])
    }))
}
