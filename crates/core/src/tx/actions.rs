use std::future::Future;

use alloy::primitives::{Address, TxHash, U256};
use num_bigint::BigUint;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{
    ActionError, ActionState, ApprovalState, ApprovalTarget, Operation, Outcome,
    PendingTransaction, Precondition, TransactionDeadline, TransactionLog, TxStatus, approval_state,
    wallet::{Erc20, StakingRewards},
};
use crate::token::{Token, TokenAmount};

/// A connected account together with its signing handles on the staking contract and
/// the staked LP token.
pub struct Wallet<S, T> {
    pub account: Address,
    pub staking: S,
    pub lp_token: T,
}

/// Drives approve, stake, unstake and claim for one staking pool, publishing every
/// state change to subscribers.
///
/// Updates are delivered through a watch channel, so once every subscriber is gone the
/// state is still tracked but nobody is notified.
pub struct FarmActions<S, T> {
    wallet: Option<Wallet<S, T>>,
    staking_address: Address,
    lp_token: Token,
    approval_margin_bps: u64,
    state: watch::Sender<ActionState>,
    log: TransactionLog,
}

impl<S: StakingRewards, T: Erc20> FarmActions<S, T> {
    pub fn new(
        staking_address: Address,
        lp_token: Token,
        wallet: Option<Wallet<S, T>>,
        approval_margin_bps: u64,
    ) -> Self {
        Self {
            wallet,
            staking_address,
            lp_token,
            approval_margin_bps,
            state: watch::Sender::new(ActionState::default()),
            log: TransactionLog::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ActionState {
        self.state.borrow().clone()
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Whether staking `amount` needs an approval. Unknown without a wallet or when the
    /// allowance can't be read.
    pub async fn approval_state(&self, amount: Option<&TokenAmount>) -> ApprovalState {
        let Some(wallet) = &self.wallet else {
            return ApprovalState::Unknown;
        };
        let allowance = match wallet.lp_token.allowance(wallet.account, self.staking_address).await {
            Ok(allowance) => Some(BigUint::from_bytes_be(&allowance.to_be_bytes::<32>())),
            Err(err) => {
                debug!(%err, "allowance unavailable");
                None
            }
        };
        let pending = self
            .log
            .has_pending_approval(self.lp_token.address, self.staking_address);
        approval_state(amount, allowance.as_ref(), pending)
    }

    /// Approves the staking contract to spend the LP token, preferring an unlimited
    /// allowance and falling back to the exact amount when that can't be estimated.
    #[instrument(skip_all, fields(farm = %self.staking_address))]
    pub async fn approve(
        &self,
        amount: Option<&TokenAmount>,
        deadline: Option<TransactionDeadline>,
    ) -> Result<Outcome, ActionError> {
        let wallet = self.wallet.as_ref().ok_or(Precondition::NoWallet)?;
        deadline.ok_or(Precondition::MissingDeadline)?;
        let amount = amount.ok_or(Precondition::MissingAmount)?;
        match self.approval_state(Some(amount)).await {
            ApprovalState::NotApproved => {}
            state => return Err(Precondition::ApprovalNotNeeded(state).into()),
        }

        let summary = format!("Approve {}", self.lp_token.symbol);
        let target = ApprovalTarget {
            token: self.lp_token.address,
            spender: self.staking_address,
        };
        self.drive(
            Operation::Approve,
            &summary,
            Some(target),
            self.submit_approval(wallet, amount.to_u256()),
        )
        .await
    }

    async fn submit_approval(&self, wallet: &Wallet<S, T>, exact: U256) -> Result<T::Pending, ActionError> {
        let spender = self.staking_address;
        let (value, estimate) = match wallet.lp_token.estimate_approve(spender, U256::MAX).await {
            Ok(gas) => (U256::MAX, gas),
            Err(err) => {
                debug!(%err, "unlimited approval not estimable, approving exact amount");
                (exact, wallet.lp_token.estimate_approve(spender, exact).await?)
            }
        };
        let gas_limit = with_margin(estimate, self.approval_margin_bps);
        wallet.lp_token.approve(spender, value, gas_limit).await
    }

    #[instrument(skip_all, fields(farm = %self.staking_address))]
    pub async fn stake(
        &self,
        amount: Option<&TokenAmount>,
        deadline: Option<TransactionDeadline>,
    ) -> Result<Outcome, ActionError> {
        let wallet = self.wallet.as_ref().ok_or(Precondition::NoWallet)?;
        let amount = amount.ok_or(Precondition::MissingAmount)?;
        deadline.ok_or(Precondition::MissingDeadline)?;

        self.drive(
            Operation::Stake,
            "Deposit liquidity",
            None,
            wallet.staking.stake(amount.to_u256()),
        )
        .await
    }

    #[instrument(skip_all, fields(farm = %self.staking_address))]
    pub async fn unstake(&self, amount: Option<&TokenAmount>) -> Result<Outcome, ActionError> {
        let wallet = self.wallet.as_ref().ok_or(Precondition::NoWallet)?;
        let amount = amount.ok_or(Precondition::MissingAmount)?;

        self.drive(
            Operation::Unstake,
            "Withdraw liquidity",
            None,
            wallet.staking.withdraw(amount.to_u256()),
        )
        .await
    }

    #[instrument(skip_all, fields(farm = %self.staking_address))]
    pub async fn claim(&self) -> Result<Outcome, ActionError> {
        let wallet = self.wallet.as_ref().ok_or(Precondition::NoWallet)?;

        self.drive(Operation::Claim, "Claim rewards", None, wallet.staking.get_reward())
            .await
    }

    /// Runs one action through the state machine. `submit` is only polled once the
    /// action slot has been claimed.
    async fn drive<P: PendingTransaction>(
        &self,
        op: Operation,
        summary: &str,
        approval: Option<ApprovalTarget>,
        submit: impl Future<Output = Result<P, ActionError>>,
    ) -> Result<Outcome, ActionError> {
        self.transition(|state| state.begin(op))?;

        let pending = match submit.await {
            Ok(pending) => pending,
            Err(err) => return Err(self.fail(op, err)),
        };
        let hash = pending.tx_hash();
        info!(%op, %hash, "transaction submitted");
        if let Err(err) = self.record_submission(hash, summary, approval) {
            return Err(self.fail(op, err));
        }

        match pending.confirm().await {
            Ok(()) => {
                self.log.finalize(hash, TxStatus::Confirmed);
                self.transition(|state| state.confirmed())?;
                info!(%op, %hash, "transaction confirmed");
                Ok(Outcome { op, hash })
            }
            Err(err) => {
                self.log.finalize(hash, TxStatus::Failed);
                Err(self.fail(op, err))
            }
        }
    }

    /// Logs a broadcast transaction and moves to awaiting confirmation. The log record
    /// is marked failed when the state refuses the move, so it never stays pending.
    fn record_submission(
        &self,
        hash: TxHash,
        summary: &str,
        approval: Option<ApprovalTarget>,
    ) -> Result<(), ActionError> {
        self.log.add(hash, summary, approval);
        self.transition(|state| state.submitted(hash)).inspect_err(|_| {
            self.log.finalize(hash, TxStatus::Failed);
        })
    }

    fn transition(
        &self,
        next: impl FnOnce(&ActionState) -> Result<ActionState, ActionError>,
    ) -> Result<(), ActionError> {
        let next = next(&self.state.borrow())?;
        if self.state.is_closed() {
            debug!(state = %next, "no subscribers left");
        }
        self.state.send_replace(next);
        Ok(())
    }

    fn fail(&self, op: Operation, err: ActionError) -> ActionError {
        warn!(%op, %err, "farm action failed");
        if let Err(illegal) = self.transition(|state| state.failed(err.clone())) {
            debug!(%illegal, "failure not recorded");
        }
        err
    }
}

fn with_margin(gas: u64, margin_bps: u64) -> u64 {
    let scaled = u128::from(gas) * u128::from(10_000 + margin_bps) / 10_000;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}
