//! Custody account holding the vault's funds
//!
//! Anyone may deposit. Funds leave only through [`CustodyAccount::release`],
//! which requires a [`ReleaseAuthorization`] that only the execution guard
//! can issue.

use crate::multisig::audit::VaultEvent;
use crate::multisig::error::VaultError;
use crate::multisig::guard::ReleaseAuthorization;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pooled balance plus the record of funds delivered to destinations
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustodyAccount {
    balance: u64,
    total_deposited: u64,
    /// Destination -> total amount delivered
    payouts: BTreeMap<String, u64>,
}

impl CustodyAccount {
    /// Create an empty account
    pub fn new() -> Self {
        Self {
            balance: 0,
            total_deposited: 0,
            payouts: BTreeMap::new(),
        }
    }

    /// Add funds from any source
    ///
    /// Fails only if the balance would overflow.
    pub fn deposit(&mut self, from: &str, amount: u64) -> Result<VaultEvent, VaultError> {
        let overflow =
            || VaultError::InvalidAmount(format!("deposit of {} overflows balance", amount));
        let balance = self.balance.checked_add(amount).ok_or_else(overflow)?;
        let total_deposited = self.total_deposited.checked_add(amount).ok_or_else(overflow)?;

        self.balance = balance;
        self.total_deposited = total_deposited;

        Ok(VaultEvent::Deposit {
            from: from.to_string(),
            amount,
            balance,
        })
    }

    /// Current balance
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Sum of all deposits ever made
    pub fn total_deposited(&self) -> u64 {
        self.total_deposited
    }

    /// Total delivered to a destination
    pub fn paid_out_to(&self, destination: &str) -> u64 {
        self.payouts.get(destination).copied().unwrap_or(0)
    }

    /// Total delivered to all destinations
    pub fn total_paid_out(&self) -> u64 {
        self.payouts.values().sum()
    }

    /// All destinations with their delivered totals
    pub fn payouts(&self) -> &BTreeMap<String, u64> {
        &self.payouts
    }

    /// Debit the balance and deliver funds to a destination
    ///
    /// All checks happen before any field changes.
    pub(crate) fn release(
        &mut self,
        _authorization: ReleaseAuthorization,
        destination: &str,
        amount: u64,
    ) -> Result<(), VaultError> {
        if amount > self.balance {
            return Err(VaultError::InsufficientFunds {
                have: self.balance,
                need: amount,
            });
        }

        let delivered = self
            .paid_out_to(destination)
            .checked_add(amount)
            .ok_or_else(|| {
                VaultError::InvalidAmount(format!("payout to {} overflows", destination))
            })?;

        self.balance -= amount;
        self.payouts.insert(destination.to_string(), delivered);
        Ok(())
    }
}
