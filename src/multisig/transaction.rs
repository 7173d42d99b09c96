//! Proposed transfer records
//!
//! A transaction is created by a proposal and only ever changes once more,
//! when it is executed.

use crate::crypto::sha256_hex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a transaction
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxStatus {
    /// Proposed, collecting confirmations
    Pending,
    /// Funds released; terminal
    Executed,
}

/// A proposed transfer out of the vault
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Sequential index, assigned at proposal time
    pub index: u64,
    /// Owner who proposed the transfer
    pub proposer: String,
    /// Recipient of the funds
    pub destination: String,
    /// Amount in the smallest unit
    pub amount: u64,
    /// Opaque payload delivered alongside the funds
    pub payload: Vec<u8>,
    /// Set exactly once, by the execution guard
    pub executed: bool,
    /// Owner who executed the transfer
    pub executed_by: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Execution timestamp
    pub executed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new pending transaction
    pub fn new(
        index: u64,
        proposer: String,
        destination: String,
        amount: u64,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            index,
            proposer,
            destination,
            amount,
            payload,
            executed: false,
            executed_by: None,
            created_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Current status
    pub fn status(&self) -> TxStatus {
        if self.executed {
            TxStatus::Executed
        } else {
            TxStatus::Pending
        }
    }

    /// Check if the transaction is still pending
    pub fn is_pending(&self) -> bool {
        !self.executed
    }

    /// Payload as a hex string
    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Content digest over the immutable proposal fields
    pub fn digest(&self) -> String {
        let data = format!(
            "{}:{}:{}:{}:{}",
            self.index,
            self.proposer,
            self.destination,
            self.amount,
            self.payload_hex()
        );
        sha256_hex(data.as_bytes())
    }

    /// Mark as executed
    pub(crate) fn mark_executed(&mut self, executor: &str) {
        self.executed = true;
        self.executed_by = Some(executor.to_string());
        self.executed_at = Some(Utc::now());
    }
}

/// Read-only view of a transaction together with its live confirmation state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransactionSnapshot {
    pub index: u64,
    pub proposer: String,
    pub destination: String,
    pub amount: u64,
    pub payload: String,
    pub executed: bool,
    pub status: TxStatus,
    pub confirmation_count: usize,
    pub confirmed_by: Vec<String>,
    /// Content digest owners can compare before confirming
    pub digest: String,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl TransactionSnapshot {
    pub(crate) fn new(tx: &Transaction, confirmed_by: Vec<String>) -> Self {
        Self {
            index: tx.index,
            proposer: tx.proposer.clone(),
            destination: tx.destination.clone(),
            amount: tx.amount,
            payload: tx.payload_hex(),
            executed: tx.executed,
            status: tx.status(),
            confirmation_count: confirmed_by.len(),
            confirmed_by,
            digest: tx.digest(),
            created_at: tx.created_at,
            executed_at: tx.executed_at,
        }
    }
}
