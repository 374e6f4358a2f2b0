//! Lifecycle of the farm page's on-chain actions: approve, stake, unstake and claim.
//!
//! Each action goes `Idle → Submitting → AwaitingConfirmation → Idle`, with the final
//! idle state carrying the outcome. Failures are surfaced as [`ActionError`] values and
//! never retried.
use std::fmt::{self, Display};

use alloy::primitives::TxHash;

pub use actions::{FarmActions, Wallet};
pub use deadline::TransactionDeadline;
pub use log::{ApprovalTarget, TransactionLog, TransactionRecord, TxStatus};
pub use state::{ActionState, ApprovalState, Operation, Outcome, Phase, approval_state};
pub use wallet::{AlloyErc20, AlloyPending, AlloyStakingRewards, Erc20, PendingTransaction, StakingRewards};

mod actions;
mod deadline;
mod log;
mod state;
mod wallet;

/// Missing inputs that keep an action from being attempted at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Precondition {
    #[error("no wallet connected")]
    NoWallet,

    #[error("no amount entered")]
    MissingAmount,

    #[error("transaction deadline not known yet")]
    MissingDeadline,

    #[error("approval not needed, allowance is {0}")]
    ApprovalNotNeeded(ApprovalState),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Precondition(#[from] Precondition),

    /// The wallet or provider refused the call, including failed gas estimation
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("failed to confirm transaction {hash}: {reason}")]
    Unconfirmed { hash: TxHash, reason: String },

    #[error("failed to read contract state: {0}")]
    Read(String),

    #[error("cannot {event} while {state}")]
    IllegalTransition { state: String, event: &'static str },
}

impl ActionError {
    pub(crate) fn illegal(state: &impl Display, event: &'static str) -> Self {
        Self::IllegalTransition {
            state: state.to_string(),
            event,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Approve => "approve",
            Operation::Stake => "stake",
            Operation::Unstake => "unstake",
            Operation::Claim => "claim",
        })
    }
}
