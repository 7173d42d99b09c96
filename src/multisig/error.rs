//! Error taxonomy for vault operations
//!
//! Every rejection leaves the vault exactly as it was before the call.

use thiserror::Error;

/// Errors returned by vault operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Caller is not an owner: {0}")]
    Unauthorized(String),
    #[error("Transaction not found: {0}")]
    NotFound(u64),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Transaction {index} already confirmed by {owner}")]
    AlreadyConfirmed { index: u64, owner: String },
    #[error("Transaction {index} not confirmed by {owner}")]
    NotConfirmed { index: u64, owner: String },
    #[error("Transaction already executed: {0}")]
    AlreadyExecuted(u64),
    #[error("Quorum not met: have {have}, need {need}")]
    QuorumNotMet { have: usize, need: usize },
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Corrupt vault state: {0}")]
    CorruptState(String),
}

impl VaultError {
    /// Whether the rejected call may succeed later without any change by
    /// the caller (more confirmations or more funds)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultError::QuorumNotMet { .. } | VaultError::InsufficientFunds { .. }
        )
    }
}

/// Convert a signed boundary amount into the unsigned unit used by the vault
///
/// Negative amounts are rejected with [`VaultError::InvalidAmount`]. Zero is
/// a valid amount.
pub fn parse_amount(amount: i64) -> Result<u64, VaultError> {
    u64::try_from(amount)
        .map_err(|_| VaultError::InvalidAmount(format!("{} is negative", amount)))
}
