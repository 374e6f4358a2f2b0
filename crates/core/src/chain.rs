use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

use alloy_chains::{self, NamedChain};
use color_eyre::eyre::{self, Context, eyre};

/// The chain the exchange is deployed on, plus the endpoints used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chain {
    pub name: NamedChain,
    pub rpc_url: String,
    pub subgraph_url: String,
    pub blocks_subgraph_url: String,
}

impl Chain {
    pub fn new(
        name: &str,
        rpc_url: &str,
        subgraph_url: &str,
        blocks_subgraph_url: &str,
    ) -> eyre::Result<Self> {
        let name = NamedChain::from_str(name)
            .wrap_err_with(|| format!("failed to parse chain name `{name}`"))?;
        match name {
            NamedChain::Polygon | NamedChain::PolygonAmoy | NamedChain::Mainnet => {}
            _ => return Err(eyre!("unsupported chain {}", name)),
        }

        Ok(Self {
            name,
            rpc_url: rpc_url.to_string(),
            subgraph_url: subgraph_url.to_string(),
            blocks_subgraph_url: blocks_subgraph_url.to_string(),
        })
    }

    pub fn metadata(&self) -> alloy_chains::Chain {
        alloy_chains::Chain::from_named(self.name)
    }

    pub fn chain_id(&self) -> u64 {
        self.metadata().id()
    }

    pub fn block_time(&self) -> Duration {
        self.metadata()
            .average_blocktime_hint()
            .unwrap_or(Duration::from_secs(2))
    }

    #[cfg(test)]
    pub fn polygon() -> Self {
        Self {
            name: NamedChain::Polygon,
            rpc_url: "https://polygon-rpc.com".to_string(),
            subgraph_url: "https://api.thegraph.com/subgraphs/name/sameepsi/quickswap06"
                .to_string(),
            blocks_subgraph_url:
                "https://api.thegraph.com/subgraphs/name/sameepsi/maticblocks".to_string(),
        }
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={})", self.name, self.chain_id())
    }
}
