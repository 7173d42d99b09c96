//! The multi-signature vault
//!
//! Composes the owner registry, transaction ledger, confirmation tracker,
//! execution guard and custody account into one owned state object. Every
//! mutation goes through `propose`, `confirm`, `revoke`, `execute` or
//! `deposit`, and each either completes fully or leaves the vault unchanged.

use crate::multisig::audit::{AuditLog, AuditRecord, VaultEvent};
use crate::multisig::confirmations::ConfirmationTracker;
use crate::multisig::custody::CustodyAccount;
use crate::multisig::error::VaultError;
use crate::multisig::guard::ExecutionGuard;
use crate::multisig::ledger::{TransactionLedger, FIRST_TX_INDEX};
use crate::multisig::registry::OwnerRegistry;
use crate::multisig::transaction::{Transaction, TransactionSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Multi-signature custody vault
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigVault {
    registry: OwnerRegistry,
    ledger: TransactionLedger,
    confirmations: ConfirmationTracker,
    custody: CustodyAccount,
    audit: AuditLog,
}

/// Log a rejected call and pass the error through
fn rejected(op: &str, caller: &str, err: VaultError) -> VaultError {
    if err.is_retryable() {
        log::info!("{} by {} deferred: {}", op, caller, err);
    } else {
        log::warn!("{} by {} rejected: {}", op, caller, err);
    }
    err
}

impl MultisigVault {
    /// Create a vault with a fixed owner set and quorum
    pub fn new(owners: Vec<String>, quorum: usize) -> Result<Self, VaultError> {
        let registry = OwnerRegistry::new(owners, quorum)?;
        Ok(Self::from_registry(registry))
    }

    /// Create an empty vault for an existing registry
    pub fn from_registry(registry: OwnerRegistry) -> Self {
        log::info!(
            "Vault created: {} at {}",
            registry.description(),
            registry.address()
        );

        Self {
            registry,
            ledger: TransactionLedger::new(),
            confirmations: ConfirmationTracker::new(),
            custody: CustodyAccount::new(),
            audit: AuditLog::new(),
        }
    }

    fn record(&mut self, event: VaultEvent) -> &AuditRecord {
        self.audit.append(event)
    }

    // =========================================================================
    // Guarded operations
    // =========================================================================

    /// Propose a transfer; returns the new transaction index
    pub fn propose(
        &mut self,
        caller: &str,
        destination: &str,
        amount: u64,
        payload: Vec<u8>,
    ) -> Result<u64, VaultError> {
        let (index, event) = self
            .ledger
            .propose(&self.registry, caller, destination, amount, payload)
            .map_err(|e| rejected("propose", caller, e))?;

        log::info!(
            "Transaction {} proposed by {}: {} to {}",
            index,
            caller,
            amount,
            destination
        );
        self.record(event);
        Ok(index)
    }

    /// Confirm a pending transaction
    pub fn confirm(&mut self, caller: &str, index: u64) -> Result<(), VaultError> {
        let event = self
            .confirmations
            .confirm(&self.registry, &self.ledger, caller, index)
            .map_err(|e| rejected("confirm", caller, e))?;

        log::info!(
            "Transaction {} confirmed by {} ({}/{})",
            index,
            caller,
            self.confirmations.count(index),
            self.registry.quorum()
        );
        self.record(event);
        Ok(())
    }

    /// Revoke an earlier confirmation
    pub fn revoke(&mut self, caller: &str, index: u64) -> Result<(), VaultError> {
        let event = self
            .confirmations
            .revoke(&self.registry, &self.ledger, caller, index)
            .map_err(|e| rejected("revoke", caller, e))?;

        log::info!(
            "Transaction {} confirmation revoked by {} ({}/{})",
            index,
            caller,
            self.confirmations.count(index),
            self.registry.quorum()
        );
        self.record(event);
        Ok(())
    }

    /// Execute a transaction that has reached quorum
    pub fn execute(&mut self, caller: &str, index: u64) -> Result<(), VaultError> {
        let event = ExecutionGuard::execute(
            &self.registry,
            &mut self.ledger,
            &self.confirmations,
            &mut self.custody,
            caller,
            index,
        )
        .map_err(|e| rejected("execute", caller, e))?;

        log::info!(
            "Transaction {} executed by {}, balance now {}",
            index,
            caller,
            self.custody.balance()
        );
        self.record(event);
        Ok(())
    }

    /// Check whether `execute` would currently succeed
    pub fn can_execute(&self, caller: &str, index: u64) -> Result<(), VaultError> {
        ExecutionGuard::check(
            &self.registry,
            &self.ledger,
            &self.confirmations,
            &self.custody,
            caller,
            index,
        )
    }

    /// Deposit funds from any source; returns the new balance
    pub fn deposit(&mut self, from: &str, amount: u64) -> Result<u64, VaultError> {
        let event = self
            .custody
            .deposit(from, amount)
            .map_err(|e| rejected("deposit", from, e))?;

        log::info!("Deposit of {} from {}", amount, from);
        self.record(event);
        Ok(self.custody.balance())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Snapshot of a transaction with its live confirmation state
    pub fn get(&self, index: u64) -> Result<TransactionSnapshot, VaultError> {
        let tx = self.ledger.get(index)?;
        Ok(self.snapshot(tx))
    }

    fn snapshot(&self, tx: &Transaction) -> TransactionSnapshot {
        TransactionSnapshot::new(
            tx,
            self.confirmations.confirmations(&self.registry, tx.index),
        )
    }

    /// Raw transaction record
    pub fn transaction(&self, index: u64) -> Result<&Transaction, VaultError> {
        self.ledger.get(index)
    }

    /// Snapshots of all transactions, oldest first
    pub fn transactions(&self) -> Vec<TransactionSnapshot> {
        self.ledger.iter().map(|tx| self.snapshot(tx)).collect()
    }

    /// Snapshots of transactions awaiting execution
    pub fn pending_transactions(&self) -> Vec<TransactionSnapshot> {
        self.ledger
            .pending()
            .into_iter()
            .map(|tx| self.snapshot(tx))
            .collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.ledger.len()
    }

    /// Live confirmation count of a transaction
    pub fn confirmation_count(&self, index: u64) -> Result<usize, VaultError> {
        self.ledger.get(index)?;
        Ok(self.confirmations.count(index))
    }

    pub fn is_confirmed(&self, index: u64, owner: &str) -> bool {
        self.confirmations.is_confirmed(index, owner)
    }

    pub fn balance(&self) -> u64 {
        self.custody.balance()
    }

    pub fn is_owner(&self, principal: &str) -> bool {
        self.registry.is_owner(principal)
    }

    pub fn owners(&self) -> &[String] {
        self.registry.owners()
    }

    pub fn quorum(&self) -> usize {
        self.registry.quorum()
    }

    pub fn registry(&self) -> &OwnerRegistry {
        &self.registry
    }

    pub fn custody(&self) -> &CustodyAccount {
        &self.custody
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// All audit records, oldest first
    pub fn events(&self) -> &[AuditRecord] {
        self.audit.records()
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Re-check every invariant
    ///
    /// Used after loading persisted state, where nothing guarantees the data
    /// went through the guarded operations.
    pub fn validate(&self) -> Result<(), VaultError> {
        let corrupt =
            |msg: String| -> Result<(), VaultError> { Err(VaultError::CorruptState(msg)) };

        OwnerRegistry::new(self.registry.owners().to_vec(), self.registry.quorum())
            .map_err(|e| VaultError::CorruptState(e.to_string()))?;

        for (expected, tx) in (FIRST_TX_INDEX..).zip(self.ledger.iter()) {
            if tx.index != expected {
                return corrupt(format!(
                    "transaction index {} found where {} expected",
                    tx.index, expected
                ));
            }
            if !self.registry.is_owner(&tx.proposer) {
                return corrupt(format!(
                    "transaction {} proposed by non-owner {}",
                    tx.index, tx.proposer
                ));
            }
            let stamped = tx.executed_by.is_some() && tx.executed_at.is_some();
            let unstamped = tx.executed_by.is_none() && tx.executed_at.is_none();
            if (tx.executed && !stamped) || (!tx.executed && !unstamped) {
                return corrupt(format!("transaction {} has inconsistent execution", tx.index));
            }
            if let Some(executor) = &tx.executed_by {
                if !self.registry.is_owner(executor) {
                    return corrupt(format!(
                        "transaction {} executed by non-owner {}",
                        tx.index, executor
                    ));
                }
            }
        }

        for (index, owner) in self.confirmations.entries() {
            if !self.ledger.contains(index) {
                return corrupt(format!("confirmation for unknown transaction {}", index));
            }
            if !self.registry.is_owner(owner) {
                return corrupt(format!(
                    "confirmation of {} by non-owner {}",
                    index, owner
                ));
            }
        }

        let mut executed_total: u64 = 0;
        let mut delivered: BTreeMap<String, u64> = BTreeMap::new();
        for tx in self.ledger.executed() {
            let count = self.confirmations.count(tx.index);
            if count < self.registry.quorum() {
                return corrupt(format!(
                    "transaction {} executed with {} of {} confirmations",
                    tx.index,
                    count,
                    self.registry.quorum()
                ));
            }
            executed_total = match executed_total.checked_add(tx.amount) {
                Some(total) => total,
                None => return corrupt("executed amounts overflow".to_string()),
            };
            *delivered.entry(tx.destination.clone()).or_insert(0) += tx.amount;
        }

        if &delivered != self.custody.payouts() {
            return corrupt(format!(
                "executed transfers {:?} differ from payouts {:?}",
                delivered,
                self.custody.payouts()
            ));
        }

        let expected_balance = self
            .custody
            .total_deposited()
            .checked_sub(executed_total);
        if expected_balance != Some(self.custody.balance()) {
            return corrupt(format!(
                "balance {} does not match deposits {} minus payouts {}",
                self.custody.balance(),
                self.custody.total_deposited(),
                executed_total
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(quorum: usize) -> MultisigVault {
        MultisigVault::new(vec!["A".into(), "B".into(), "C".into()], quorum).unwrap()
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            MultisigVault::new(vec![], 1),
            Err(VaultError::InvalidConfig(_))
        ));
        assert!(matches!(
            MultisigVault::new(vec!["A".into(), "B".into()], 3),
            Err(VaultError::InvalidConfig(_))
        ));
        assert!(matches!(
            MultisigVault::new(vec!["A".into(), "A".into()], 1),
            Err(VaultError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_owner_propose_leaves_ledger_unchanged() {
        let mut vault = vault(1);

        let result = vault.propose("mallory", "D", 10, vec![]);
        assert_eq!(result, Err(VaultError::Unauthorized("mallory".to_string())));
        assert_eq!(vault.transaction_count(), 0);
        assert!(vault.events().is_empty());
    }

    #[test]
    fn test_double_confirm_counts_once() {
        let mut vault = vault(2);
        let index = vault.propose("A", "D", 10, vec![]).unwrap();

        vault.confirm("B", index).unwrap();
        assert!(matches!(
            vault.confirm("B", index),
            Err(VaultError::AlreadyConfirmed { .. })
        ));
        assert_eq!(vault.get(index).unwrap().confirmation_count, 1);
        assert_eq!(vault.confirmation_count(index).unwrap(), 1);
    }

    #[test]
    fn test_quorum_boundary() {
        let mut vault = vault(2);
        vault.deposit("funder", 100).unwrap();
        let index = vault.propose("A", "D", 100, vec![]).unwrap();

        vault.confirm("A", index).unwrap();
        assert_eq!(
            vault.execute("A", index),
            Err(VaultError::QuorumNotMet { have: 1, need: 2 })
        );

        vault.confirm("C", index).unwrap();
        assert!(vault.can_execute("B", index).is_ok());
        vault.execute("B", index).unwrap();
        assert!(vault.get(index).unwrap().executed);
    }

    #[test]
    fn test_at_most_once_execution() {
        let mut vault = vault(1);
        vault.deposit("funder", 1000).unwrap();
        let index = vault.propose("A", "D", 400, vec![]).unwrap();
        vault.confirm("A", index).unwrap();

        vault.execute("A", index).unwrap();
        for caller in ["A", "B", "C"] {
            assert_eq!(
                vault.execute(caller, index),
                Err(VaultError::AlreadyExecuted(index))
            );
        }

        assert_eq!(vault.balance(), 600);
        assert_eq!(vault.custody().paid_out_to("D"), 400);
    }

    #[test]
    fn test_executed_is_terminal() {
        let mut vault = vault(1);
        let index = vault.propose("A", "D", 0, vec![0xde, 0xad]).unwrap();
        vault.confirm("A", index).unwrap();
        vault.execute("A", index).unwrap();

        assert_eq!(vault.confirm("B", index), Err(VaultError::AlreadyExecuted(index)));
        assert_eq!(vault.revoke("A", index), Err(VaultError::AlreadyExecuted(index)));
        assert_eq!(vault.get(index).unwrap().payload, "dead");
    }

    #[test]
    fn test_revoke_drops_below_quorum() {
        let mut vault = vault(2);
        vault.deposit("funder", 50).unwrap();
        let index = vault.propose("A", "D", 50, vec![]).unwrap();
        vault.confirm("A", index).unwrap();
        vault.confirm("B", index).unwrap();

        vault.revoke("B", index).unwrap();
        assert_eq!(
            vault.execute("A", index),
            Err(VaultError::QuorumNotMet { have: 1, need: 2 })
        );
        assert!(!vault.is_confirmed(index, "B"));
        assert!(matches!(
            vault.revoke("B", index),
            Err(VaultError::NotConfirmed { .. })
        ));
    }

    #[test]
    fn test_fund_conservation() {
        let mut vault = vault(1);
        let amounts = [300u64, 200, 900, 0];
        let deposits = [500u64, 250, 100];

        let mut deposited = 0;
        let mut executed = 0;
        let mut indices = Vec::new();
        for amount in amounts {
            let index = vault.propose("A", "D", amount, vec![]).unwrap();
            vault.confirm("B", index).unwrap();
            indices.push(index);
        }

        for deposit in deposits {
            vault.deposit("funder", deposit).unwrap();
            deposited += deposit;
            for (&index, &amount) in indices.iter().zip(amounts.iter()) {
                if vault.get(index).unwrap().executed {
                    continue;
                }
                match vault.execute("C", index) {
                    Ok(()) => executed += amount,
                    Err(VaultError::InsufficientFunds { have, need }) => {
                        assert!(have < need);
                    }
                    Err(e) => panic!("unexpected error: {}", e),
                }
                assert_eq!(vault.balance(), deposited - executed);
            }
        }

        assert_eq!(vault.custody().total_paid_out(), executed);
        assert!(vault.validate().is_ok());
    }

    #[test]
    fn test_scenario_single_confirmation() {
        let mut vault = vault(1);

        vault.deposit("A", 1000).unwrap();
        let index = vault.propose("A", "D", 1000, vec![]).unwrap();
        assert_eq!(index, 1);

        vault.confirm("A", index).unwrap();
        assert_eq!(vault.get(index).unwrap().confirmation_count, 1);

        vault.execute("A", index).unwrap();
        assert_eq!(vault.balance(), 0);
        assert_eq!(vault.custody().paid_out_to("D"), 1000);
        assert!(vault.get(index).unwrap().executed);

        assert_eq!(
            vault.execute("A", index),
            Err(VaultError::AlreadyExecuted(index))
        );
    }

    #[test]
    fn test_scenario_funds_arrive_late() {
        let mut vault = vault(2);

        let index = vault.propose("A", "D", 500, vec![]).unwrap();
        vault.confirm("A", index).unwrap();
        vault.confirm("B", index).unwrap();
        assert_eq!(vault.get(index).unwrap().confirmation_count, 2);

        assert_eq!(
            vault.execute("A", index),
            Err(VaultError::InsufficientFunds { have: 0, need: 500 })
        );
        assert!(!vault.get(index).unwrap().executed);

        vault.deposit("anyone", 500).unwrap();
        vault.execute("A", index).unwrap();
        assert_eq!(vault.balance(), 0);
        assert_eq!(vault.custody().paid_out_to("D"), 500);
    }

    #[test]
    fn test_audit_log_records_successes_only() {
        let mut vault = vault(1);
        vault.deposit("funder", 10).unwrap();
        let index = vault.propose("A", "D", 10, vec![]).unwrap();
        let _ = vault.execute("A", index);
        vault.confirm("A", index).unwrap();
        vault.execute("A", index).unwrap();

        let names: Vec<&str> = vault.events().iter().map(|r| r.event.name()).collect();
        assert_eq!(names, vec!["Deposit", "Submit", "Confirm", "Execute"]);
        assert_eq!(vault.audit().for_transaction(index).len(), 3);
    }

    #[test]
    fn test_listing_views() {
        let mut vault = vault(1);
        let first = vault.propose("A", "D", 0, vec![]).unwrap();
        vault.propose("B", "E", 0, vec![]).unwrap();
        vault.confirm("A", first).unwrap();
        vault.execute("A", first).unwrap();

        assert_eq!(vault.transactions().len(), 2);
        let pending = vault.pending_transactions();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].destination, "E");
        assert_eq!(vault.confirmation_count(99), Err(VaultError::NotFound(99)));
    }

    #[test]
    fn test_validate_detects_tampering() {
        let mut vault = vault(2);
        vault.deposit("funder", 100).unwrap();
        vault.propose("A", "D", 60, vec![]).unwrap();
        assert!(vault.validate().is_ok());

        // Mark executed without confirmations or payout
        let mut json = serde_json::to_value(&vault).unwrap();
        json["ledger"]["transactions"][0]["executed"] = serde_json::json!(true);
        json["ledger"]["transactions"][0]["executed_by"] = serde_json::json!("A");
        let tampered: MultisigVault = serde_json::from_value(json).unwrap();

        assert!(matches!(
            tampered.validate(),
            Err(VaultError::CorruptState(_))
        ));
    }

    fn executed_vault() -> serde_json::Value {
        let mut vault = vault(1);
        vault.deposit("funder", 100).unwrap();
        let index = vault.propose("A", "D", 60, vec![]).unwrap();
        vault.confirm("A", index).unwrap();
        vault.execute("B", index).unwrap();
        assert!(vault.validate().is_ok());
        serde_json::to_value(&vault).unwrap()
    }

    fn assert_corrupt(json: serde_json::Value) {
        let tampered: MultisigVault = serde_json::from_value(json).unwrap();
        assert!(matches!(
            tampered.validate(),
            Err(VaultError::CorruptState(_))
        ));
    }

    #[test]
    fn test_validate_detects_redirected_payout() {
        let mut json = executed_vault();
        json["custody"]["payouts"] = serde_json::json!({ "E": 60 });
        assert_corrupt(json);
    }

    #[test]
    fn test_validate_detects_foreign_executor() {
        let mut json = executed_vault();
        json["ledger"]["transactions"][0]["executed_by"] = serde_json::json!("mallory");
        assert_corrupt(json);
    }

    #[test]
    fn test_validate_detects_missing_execution_time() {
        let mut json = executed_vault();
        json["ledger"]["transactions"][0]["executed_at"] = serde_json::Value::Null;
        assert_corrupt(json);
    }

    #[test]
    fn test_rejected_calls_leave_audit_log_unchanged() {
        let mut vault = vault(2);
        let index = vault.propose("A", "D", 10, vec![]).unwrap();
        vault.confirm("A", index).unwrap();
        let before = vault.events().len();

        assert!(vault.revoke("mallory", index).is_err());
        assert!(vault.revoke("B", index).is_err());
        assert!(vault.revoke("A", 99).is_err());
        assert!(vault.execute("A", index).is_err());
        assert!(vault.execute("mallory", index).is_err());
        assert!(vault.deposit("funder", u64::MAX).is_ok());
        assert!(vault.deposit("funder", 1).is_err());

        assert_eq!(vault.events().len(), before + 1);
        assert!(vault.is_confirmed(index, "A"));
        assert_eq!(vault.balance(), u64::MAX);
    }
}
