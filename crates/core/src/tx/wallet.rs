//! Signing seams for farm actions. The alloy implementations submit through a
//! wallet-filled provider; tests substitute in-memory fakes.
use std::future::Future;

use alloy::{
    network::Ethereum,
    primitives::{Address, TxHash, U256},
    providers::{PendingTransactionBuilder, Provider},
};

use super::ActionError;
use crate::{
    config::GasLimits,
    contracts::{IERC20, IStakingRewards},
};

/// A broadcast transaction that can be awaited until mined.
pub trait PendingTransaction: Send {
    fn tx_hash(&self) -> TxHash;

    /// Resolves once mined; a reverted transaction is an error.
    fn confirm(self) -> impl Future<Output = Result<(), ActionError>> + Send;
}

/// Write calls of a StakingRewards contract.
pub trait StakingRewards: Sync {
    type Pending: PendingTransaction;

    fn stake(&self, amount: U256) -> impl Future<Output = Result<Self::Pending, ActionError>> + Send;

    fn withdraw(&self, amount: U256) -> impl Future<Output = Result<Self::Pending, ActionError>> + Send;

    fn get_reward(&self) -> impl Future<Output = Result<Self::Pending, ActionError>> + Send;
}

/// The ERC-20 calls needed for approvals.
pub trait Erc20: Sync {
    type Pending: PendingTransaction;

    fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, ActionError>> + Send;

    fn estimate_approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> impl Future<Output = Result<u64, ActionError>> + Send;

    fn approve(
        &self,
        spender: Address,
        amount: U256,
        gas_limit: u64,
    ) -> impl Future<Output = Result<Self::Pending, ActionError>> + Send;
}

pub struct AlloyPending(PendingTransactionBuilder<Ethereum>);

impl PendingTransaction for AlloyPending {
    fn tx_hash(&self) -> TxHash {
        *self.0.tx_hash()
    }

    async fn confirm(self) -> Result<(), ActionError> {
        let hash = *self.0.tx_hash();
        let receipt = self.0.get_receipt().await.map_err(|err| ActionError::Unconfirmed {
            hash,
            reason: err.to_string(),
        })?;

        if receipt.status() {
            Ok(())
        } else {
            Err(ActionError::Reverted(hash))
        }
    }
}

fn rejected(err: alloy::contract::Error) -> ActionError {
    ActionError::Rejected(err.to_string())
}

pub struct AlloyStakingRewards<P> {
    contract: IStakingRewards::IStakingRewardsInstance<P>,
    gas: GasLimits,
}

impl<P: Provider> AlloyStakingRewards<P> {
    pub fn new(address: Address, provider: P, gas: GasLimits) -> Self {
        Self {
            contract: IStakingRewards::new(address, provider),
            gas,
        }
    }
}

impl<P: Provider> StakingRewards for AlloyStakingRewards<P> {
    type Pending = AlloyPending;

    async fn stake(&self, amount: U256) -> Result<AlloyPending, ActionError> {
        let pending = self
            .contract
            .stake(amount)
            .gas(self.gas.stake)
            .send()
            .await
            .map_err(rejected)?;
        Ok(AlloyPending(pending))
    }

    async fn withdraw(&self, amount: U256) -> Result<AlloyPending, ActionError> {
        let pending = self
            .contract
            .withdraw(amount)
            .gas(self.gas.withdraw)
            .send()
            .await
            .map_err(rejected)?;
        Ok(AlloyPending(pending))
    }

    async fn get_reward(&self) -> Result<AlloyPending, ActionError> {
        let pending = self
            .contract
            .getReward()
            .gas(self.gas.claim)
            .send()
            .await
            .map_err(rejected)?;
        Ok(AlloyPending(pending))
    }
}

pub struct AlloyErc20<P> {
    contract: IERC20::IERC20Instance<P>,
}

impl<P: Provider> AlloyErc20<P> {
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            contract: IERC20::new(address, provider),
        }
    }
}

impl<P: Provider> Erc20 for AlloyErc20<P> {
    type Pending = AlloyPending;

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, ActionError> {
        self.contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|err| ActionError::Read(err.to_string()))
    }

    async fn estimate_approve(&self, spender: Address, amount: U256) -> Result<u64, ActionError> {
        self.contract
            .approve(spender, amount)
            .estimate_gas()
            .await
            .map_err(rejected)
    }

    async fn approve(
        &self,
        spender: Address,
        amount: U256,
        gas_limit: u64,
    ) -> Result<AlloyPending, ActionError> {
        let pending = self
            .contract
            .approve(spender, amount)
            .gas(gas_limit)
            .send()
            .await
            .map_err(rejected)?;
        Ok(AlloyPending(pending))
    }
}
