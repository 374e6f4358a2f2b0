use std::time::{SystemTime, UNIX_EPOCH};

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, Provider as _, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use color_eyre::eyre::{self, Context as _, OptionExt as _};
use quickdex_core::{
    analytics::Analytics,
    chain::Chain,
    config::Config,
    subgraph::{SubgraphClient, SubgraphId},
};

pub(crate) fn analytics(config: &Config) -> Analytics<SubgraphClient> {
    let http = reqwest::Client::new();
    Analytics::new(
        SubgraphClient::with_http(http.clone(), &config.chain.subgraph_url),
        SubgraphClient::with_http(http, &config.chain.blocks_subgraph_url),
        &config.exchange.bundle_id,
        SubgraphId::from(config.exchange.factory_address),
        config.exchange.lp_fee_bps as f64 / 10_000.0,
    )
}

pub(crate) fn unix_now() -> eyre::Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .wrap_err("system clock is before the unix epoch")?
        .as_secs())
}

pub(crate) fn parse_id(raw: &str) -> eyre::Result<SubgraphId> {
    SubgraphId::parse(raw).wrap_err_with(|| format!("invalid id `{raw}`"))
}

pub(crate) fn read_provider(chain: &Chain) -> eyre::Result<DynProvider> {
    Ok(ProviderBuilder::new()
        .connect_http(chain.rpc_url.parse().wrap_err("Failed to parse RPC URL")?)
        .erased())
}

pub(crate) fn signer(config: &Config) -> eyre::Result<PrivateKeySigner> {
    config
        .private_key
        .as_deref()
        .ok_or_eyre("no private key configured, set QUICKDEX_PRIVATE_KEY")?
        .parse()
        .wrap_err("Failed to parse private key")
}

pub(crate) fn wallet_provider(chain: &Chain, signer: PrivateKeySigner) -> eyre::Result<DynProvider> {
    Ok(ProviderBuilder::new()
        .wallet(EthereumWallet::new(signer))
        .connect_http(chain.rpc_url.parse().wrap_err("Failed to parse RPC URL")?)
        .erased())
}
