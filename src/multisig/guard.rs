//! Execution guard
//!
//! Moves a transaction from pending to executed exactly once. It is the only
//! code that can issue a [`ReleaseAuthorization`], so it is the only path by
//! which funds leave custody.

use crate::multisig::audit::VaultEvent;
use crate::multisig::confirmations::ConfirmationTracker;
use crate::multisig::custody::CustodyAccount;
use crate::multisig::error::VaultError;
use crate::multisig::ledger::TransactionLedger;
use crate::multisig::registry::OwnerRegistry;

/// Capability required by [`CustodyAccount::release`]
///
/// Cannot be constructed outside this module.
#[derive(Debug)]
pub struct ReleaseAuthorization {
    _private: (),
}

/// Quorum and balance checks plus the execute transition
pub struct ExecutionGuard;

impl ExecutionGuard {
    /// Run every execute precondition without mutating anything
    ///
    /// Returns the error `execute` would return, in the same order:
    /// unauthorized, not found, already executed, quorum, funds.
    pub fn check(
        registry: &OwnerRegistry,
        ledger: &TransactionLedger,
        tracker: &ConfirmationTracker,
        custody: &CustodyAccount,
        caller: &str,
        index: u64,
    ) -> Result<(), VaultError> {
        registry.ensure_owner(caller)?;

        let tx = ledger.get(index)?;
        if tx.executed {
            return Err(VaultError::AlreadyExecuted(index));
        }

        let have = tracker.count(index);
        if have < registry.quorum() {
            return Err(VaultError::QuorumNotMet {
                have,
                need: registry.quorum(),
            });
        }

        if custody.balance() < tx.amount {
            return Err(VaultError::InsufficientFunds {
                have: custody.balance(),
                need: tx.amount,
            });
        }

        Ok(())
    }

    /// Execute a transaction
    ///
    /// On success the executed flag, the balance debit and the delivery to
    /// the destination all happen; on failure none of them do.
    pub fn execute(
        registry: &OwnerRegistry,
        ledger: &mut TransactionLedger,
        tracker: &ConfirmationTracker,
        custody: &mut CustodyAccount,
        caller: &str,
        index: u64,
    ) -> Result<VaultEvent, VaultError> {
        Self::check(registry, ledger, tracker, custody, caller, index)?;

        let tx = ledger.get_mut(index)?;
        custody.release(ReleaseAuthorization { _private: () }, &tx.destination, tx.amount)?;
        tx.mark_executed(caller);

        Ok(VaultEvent::Execute {
            owner: caller.to_string(),
            index,
            destination: tx.destination.clone(),
            amount: tx.amount,
        })
    }
}
