use std::time::SystemTime;

use alloy::primitives::{Address, TxHash};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Token and spender of an approval transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalTarget {
    pub token: Address,
    pub spender: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub summary: String,
    pub submitted_at: SystemTime,
    pub status: TxStatus,
    pub approval: Option<ApprovalTarget>,
}

/// Transactions submitted from this session, observable through [`TransactionLog::subscribe`].
#[derive(Debug)]
pub struct TransactionLog {
    records: watch::Sender<Vec<TransactionRecord>>,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self {
            records: watch::Sender::new(Vec::new()),
        }
    }
}

impl TransactionLog {
    pub fn subscribe(&self) -> watch::Receiver<Vec<TransactionRecord>> {
        self.records.subscribe()
    }

    pub fn add(&self, hash: TxHash, summary: &str, approval: Option<ApprovalTarget>) {
        self.records.send_modify(|records| {
            records.push(TransactionRecord {
                hash,
                summary: summary.to_string(),
                submitted_at: SystemTime::now(),
                status: TxStatus::Pending,
                approval,
            })
        });
    }

    /// Marks a pending transaction as confirmed or failed. Unknown hashes are ignored.
    pub fn finalize(&self, hash: TxHash, status: TxStatus) {
        self.records.send_if_modified(|records| {
            match records.iter_mut().find(|r| r.hash == hash && r.status == TxStatus::Pending) {
                Some(record) => {
                    record.status = status;
                    true
                }
                None => false,
            }
        });
    }

    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.borrow().clone()
    }

    pub fn pending(&self) -> Vec<TransactionRecord> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.status == TxStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn has_pending_approval(&self, token: Address, spender: Address) -> bool {
        let target = ApprovalTarget { token, spender };
        self.records
            .borrow()
            .iter()
            .any(|r| r.status == TxStatus::Pending && r.approval == Some(target))
    }
}
