//! Append-only transaction ledger
//!
//! Transactions are addressed by a sequential index starting at
//! [`FIRST_TX_INDEX`] and are never removed.

use crate::multisig::audit::VaultEvent;
use crate::multisig::error::VaultError;
use crate::multisig::registry::OwnerRegistry;
use crate::multisig::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Index assigned to the first proposal
pub const FIRST_TX_INDEX: u64 = 1;

/// Store of proposed transactions
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
}

impl TransactionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
        }
    }

    /// Propose a new transfer
    ///
    /// Only owners may propose. A zero amount is valid (payload-only
    /// transfer).
    pub fn propose(
        &mut self,
        registry: &OwnerRegistry,
        caller: &str,
        destination: &str,
        amount: u64,
        payload: Vec<u8>,
    ) -> Result<(u64, VaultEvent), VaultError> {
        registry.ensure_owner(caller)?;

        let index = self.next_index();
        let tx = Transaction::new(
            index,
            caller.to_string(),
            destination.to_string(),
            amount,
            payload,
        );

        let event = VaultEvent::Submit {
            owner: caller.to_string(),
            index,
            destination: tx.destination.clone(),
            amount,
            payload: tx.payload_hex(),
        };

        self.transactions.push(tx);
        Ok((index, event))
    }

    /// Index the next proposal will receive
    pub fn next_index(&self) -> u64 {
        FIRST_TX_INDEX + self.transactions.len() as u64
    }

    fn slot(&self, index: u64) -> Option<usize> {
        let slot = index.checked_sub(FIRST_TX_INDEX)? as usize;
        (slot < self.transactions.len()).then_some(slot)
    }

    /// Get a transaction by index
    pub fn get(&self, index: u64) -> Result<&Transaction, VaultError> {
        self.slot(index)
            .map(|slot| &self.transactions[slot])
            .ok_or(VaultError::NotFound(index))
    }

    pub(crate) fn get_mut(&mut self, index: u64) -> Result<&mut Transaction, VaultError> {
        match self.slot(index) {
            Some(slot) => Ok(&mut self.transactions[slot]),
            None => Err(VaultError::NotFound(index)),
        }
    }

    /// Check whether an index refers to a proposed transaction
    pub fn contains(&self, index: u64) -> bool {
        self.slot(index).is_some()
    }

    /// All transactions, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Transactions still awaiting execution
    pub fn pending(&self) -> Vec<&Transaction> {
        self.transactions.iter().filter(|tx| tx.is_pending()).collect()
    }

    /// Transactions that have been executed
    pub fn executed(&self) -> Vec<&Transaction> {
        self.transactions.iter().filter(|tx| tx.executed).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
