//! Per-owner confirmation tracking
//!
//! The tracker is the only writer of the (transaction, owner) relation. The
//! confirmation count of a transaction is always derived from it.

use crate::multisig::audit::VaultEvent;
use crate::multisig::error::VaultError;
use crate::multisig::ledger::TransactionLedger;
use crate::multisig::registry::OwnerRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Confirmation matrix: transaction index -> confirming owners
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfirmationTracker {
    confirmed: BTreeMap<u64, BTreeSet<String>>,
}

impl ConfirmationTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            confirmed: BTreeMap::new(),
        }
    }

    /// Check the preconditions shared by confirm and revoke
    fn ensure_open(
        registry: &OwnerRegistry,
        ledger: &TransactionLedger,
        caller: &str,
        index: u64,
    ) -> Result<(), VaultError> {
        registry.ensure_owner(caller)?;
        if ledger.get(index)?.executed {
            return Err(VaultError::AlreadyExecuted(index));
        }
        Ok(())
    }

    /// Record the caller's approval of a pending transaction
    pub fn confirm(
        &mut self,
        registry: &OwnerRegistry,
        ledger: &TransactionLedger,
        caller: &str,
        index: u64,
    ) -> Result<VaultEvent, VaultError> {
        Self::ensure_open(registry, ledger, caller, index)?;

        if self.is_confirmed(index, caller) {
            return Err(VaultError::AlreadyConfirmed {
                index,
                owner: caller.to_string(),
            });
        }

        self.confirmed
            .entry(index)
            .or_default()
            .insert(caller.to_string());

        Ok(VaultEvent::Confirm {
            owner: caller.to_string(),
            index,
        })
    }

    /// Withdraw the caller's earlier approval of a pending transaction
    pub fn revoke(
        &mut self,
        registry: &OwnerRegistry,
        ledger: &TransactionLedger,
        caller: &str,
        index: u64,
    ) -> Result<VaultEvent, VaultError> {
        Self::ensure_open(registry, ledger, caller, index)?;

        let removed = match self.confirmed.get_mut(&index) {
            Some(owners) => owners.remove(caller),
            None => false,
        };
        if !removed {
            return Err(VaultError::NotConfirmed {
                index,
                owner: caller.to_string(),
            });
        }

        if self.confirmed.get(&index).is_some_and(|o| o.is_empty()) {
            self.confirmed.remove(&index);
        }

        Ok(VaultEvent::Revoke {
            owner: caller.to_string(),
            index,
        })
    }

    /// Check if an owner has confirmed a transaction
    pub fn is_confirmed(&self, index: u64, owner: &str) -> bool {
        self.confirmed
            .get(&index)
            .is_some_and(|owners| owners.contains(owner))
    }

    /// Live confirmation count
    pub fn count(&self, index: u64) -> usize {
        self.confirmed.get(&index).map_or(0, |owners| owners.len())
    }

    /// Confirming owners, in registry order
    pub fn confirmations(&self, registry: &OwnerRegistry, index: u64) -> Vec<String> {
        registry
            .owners()
            .iter()
            .filter(|owner| self.is_confirmed(index, owner))
            .cloned()
            .collect()
    }

    /// Every (index, owner) pair currently confirmed
    pub fn entries(&self) -> impl Iterator<Item = (u64, &str)> {
        self.confirmed
            .iter()
            .flat_map(|(index, owners)| owners.iter().map(move |o| (*index, o.as_str())))
    }
}
