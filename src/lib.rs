//! Multisig Vault: a multi-signature custody engine in Rust
//!
//! This crate provides a custody vault that releases funds only after a
//! quorum of designated owners approves a proposed transfer:
//! - Immutable M-of-N owner registry with a deterministic custody address
//! - Append-only transaction ledger with sequential indices
//! - Per-owner confirmation tracking with revocation
//! - Guarded, at-most-once execution tied to quorum and available funds
//! - Append-only audit log of every successful operation
//! - JSON persistence with atomic writes and backups
//! - CLI and REST/WebSocket API
//!
//! # Example
//!
//! ```rust
//! use multisig_vault::MultisigVault;
//!
//! let owners = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
//! let mut vault = MultisigVault::new(owners, 1).unwrap();
//!
//! vault.deposit("alice", 1000).unwrap();
//! let index = vault.propose("alice", "dave", 1000, vec![]).unwrap();
//! vault.confirm("alice", index).unwrap();
//! vault.execute("alice", index).unwrap();
//!
//! assert_eq!(vault.balance(), 0);
//! assert!(vault.execute("alice", index).is_err());
//! ```

pub mod api;
pub mod cli;
pub mod crypto;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use multisig::{
    AuditLog, AuditRecord, ConfirmationTracker, CustodyAccount, ExecutionGuard, MultisigVault,
    OwnerRegistry, Transaction, TransactionLedger, TransactionSnapshot, TxStatus, VaultError,
    VaultEvent,
};
pub use storage::{Storage, StorageConfig, StorageError};
