use alloy::{
    eips::BlockNumberOrTag,
    primitives::U256,
    providers::Provider,
};
use color_eyre::eyre::{self, Context as _, OptionExt as _};

/// Latest time at which a submitted transaction may still be mined, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionDeadline(u64);

impl TransactionDeadline {
    pub fn from_block_timestamp(timestamp: u64, ttl_secs: u64) -> Self {
        Self(timestamp.saturating_add(ttl_secs))
    }

    /// `ttl_secs` after the timestamp of the latest block.
    pub async fn latest<P: Provider>(provider: &P, ttl_secs: u64) -> eyre::Result<Self> {
        let block = provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .wrap_err("failed to fetch latest block")?
            .ok_or_eyre("latest block not available")?;
        Ok(Self::from_block_timestamp(block.header.timestamp, ttl_secs))
    }

    pub fn timestamp(&self) -> u64 {
        self.0
    }

    pub fn to_u256(&self) -> U256 {
        U256::from(self.0)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.0
    }
}
