//! Multi-signature custody vault
//!
//! Holds a pool of funds and releases them only after a quorum of the
//! designated owners confirm a proposed transfer.
//!
//! # Example
//!
//! ```rust
//! use multisig_vault::multisig::MultisigVault;
//!
//! // Create a 2-of-3 vault
//! let owners = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
//! let mut vault = MultisigVault::new(owners, 2).unwrap();
//!
//! // Fund it and propose a transfer
//! vault.deposit("anyone", 500).unwrap();
//! let index = vault.propose("alice", "dave", 500, vec![]).unwrap();
//!
//! // Collect confirmations, then execute
//! vault.confirm("alice", index).unwrap();
//! vault.confirm("bob", index).unwrap();
//! vault.execute("carol", index).unwrap();
//!
//! assert_eq!(vault.balance(), 0);
//! assert_eq!(vault.custody().paid_out_to("dave"), 500);
//! ```

pub mod audit;
pub mod confirmations;
pub mod custody;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod registry;
pub mod transaction;
pub mod vault;

pub use audit::{AuditLog, AuditRecord, VaultEvent};
pub use confirmations::ConfirmationTracker;
pub use custody::CustodyAccount;
pub use error::{parse_amount, VaultError};
pub use guard::ExecutionGuard;
pub use ledger::{TransactionLedger, FIRST_TX_INDEX};
pub use registry::OwnerRegistry;
pub use transaction::{Transaction, TransactionSnapshot, TxStatus};
pub use vault::MultisigVault;
