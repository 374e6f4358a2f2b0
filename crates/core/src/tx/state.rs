use std::fmt::{self, Display};

use alloy::primitives::TxHash;
use num_bigint::BigUint;

use super::ActionError;
use crate::token::TokenAmount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Approve,
    Stake,
    Unstake,
    Claim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the wallet to sign and broadcast
    Submitting,
    AwaitingConfirmation(TxHash),
}

/// A confirmed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub op: Operation,
    pub hash: TxHash,
}

/// State of a farm card's single action slot. One action runs at a time, so two
/// concurrent actions on the same card cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionState {
    Idle {
        /// Result of the last action, if any ran
        last: Option<Result<Outcome, ActionError>>,
    },
    InFlight {
        op: Operation,
        phase: Phase,
    },
}

impl Default for ActionState {
    fn default() -> Self {
        Self::Idle { last: None }
    }
}

impl ActionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }

    pub fn in_flight(&self) -> Option<Operation> {
        match self {
            Self::InFlight { op, .. } => Some(*op),
            Self::Idle { .. } => None,
        }
    }

    pub fn last(&self) -> Option<&Result<Outcome, ActionError>> {
        match self {
            Self::Idle { last } => last.as_ref(),
            Self::InFlight { .. } => None,
        }
    }

    /// The user started `op`.
    pub fn begin(&self, op: Operation) -> Result<Self, ActionError> {
        match self {
            Self::Idle { .. } => Ok(Self::InFlight {
                op,
                phase: Phase::Submitting,
            }),
            Self::InFlight { .. } => Err(ActionError::illegal(self, "begin")),
        }
    }

    /// The wallet broadcast the transaction.
    pub fn submitted(&self, hash: TxHash) -> Result<Self, ActionError> {
        match self {
            Self::InFlight {
                op,
                phase: Phase::Submitting,
            } => Ok(Self::InFlight {
                op: *op,
                phase: Phase::AwaitingConfirmation(hash),
            }),
            _ => Err(ActionError::illegal(self, "submit")),
        }
    }

    /// The transaction was mined successfully.
    pub fn confirmed(&self) -> Result<Self, ActionError> {
        match self {
            Self::InFlight {
                op,
                phase: Phase::AwaitingConfirmation(hash),
            } => Ok(Self::Idle {
                last: Some(Ok(Outcome {
                    op: *op,
                    hash: *hash,
                })),
            }),
            _ => Err(ActionError::illegal(self, "confirm")),
        }
    }

    /// Submission or confirmation failed; back to idle with the error.
    pub fn failed(&self, error: ActionError) -> Result<Self, ActionError> {
        match self {
            Self::InFlight { .. } => Ok(Self::Idle {
                last: Some(Err(error)),
            }),
            Self::Idle { .. } => Err(ActionError::illegal(self, "fail")),
        }
    }
}

impl Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle { .. } => f.write_str("idle"),
            Self::InFlight {
                op,
                phase: Phase::Submitting,
            } => write!(f, "submitting {op}"),
            Self::InFlight {
                op,
                phase: Phase::AwaitingConfirmation(hash),
            } => write!(f, "awaiting confirmation of {op} ({hash})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Unknown,
    NotApproved,
    Pending,
    Approved,
}

impl Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApprovalState::Unknown => "unknown",
            ApprovalState::NotApproved => "not approved",
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
        })
    }
}

/// Whether spending `amount` needs an approval first, given the current allowance and
/// whether an approval transaction is still pending.
pub fn approval_state(
    amount: Option<&TokenAmount>,
    allowance: Option<&BigUint>,
    pending_approval: bool,
) -> ApprovalState {
    let (Some(amount), Some(allowance)) = (amount, allowance) else {
        return ApprovalState::Unknown;
    };
    if *allowance >= amount.raw {
        ApprovalState::Approved
    } else if pending_approval {
        ApprovalState::Pending
    } else {
        ApprovalState::NotApproved
    }
}
