//! Owner registry
//!
//! The immutable M-of-N owner set of a vault: who may act, and how many
//! distinct owners must confirm before funds move.

use crate::crypto::{double_sha256, sha256};
use crate::multisig::error::VaultError;
use ripemd::{Digest, Ripemd160};
use serde::{Deserialize, Serialize};

/// Version byte for custody addresses (produces addresses starting with '3')
const ADDRESS_VERSION: u8 = 0x05;

/// Immutable set of owners and the quorum threshold
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerRegistry {
    /// Owners in registration order
    owners: Vec<String>,
    /// Minimum distinct confirmations required (M in M-of-N)
    quorum: usize,
}

impl OwnerRegistry {
    /// Create a new registry
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidConfig`] if the owner list is empty,
    /// contains a blank or duplicate owner, or if the quorum is outside
    /// `1..=owners.len()`.
    pub fn new(owners: Vec<String>, quorum: usize) -> Result<Self, VaultError> {
        if owners.is_empty() {
            return Err(VaultError::InvalidConfig(
                "at least one owner is required".to_string(),
            ));
        }

        if owners.iter().any(|o| o.trim().is_empty()) {
            return Err(VaultError::InvalidConfig(
                "owner identifiers must not be blank".to_string(),
            ));
        }

        if quorum == 0 {
            return Err(VaultError::InvalidConfig(
                "quorum must be at least 1".to_string(),
            ));
        }

        if quorum > owners.len() {
            return Err(VaultError::InvalidConfig(format!(
                "quorum {} exceeds owner count {}",
                quorum,
                owners.len()
            )));
        }

        let mut sorted = owners.clone();
        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(VaultError::InvalidConfig(format!(
                "duplicate owner: {}",
                pair[0]
            )));
        }

        Ok(Self { owners, quorum })
    }

    /// Check if a principal is an owner
    pub fn is_owner(&self, principal: &str) -> bool {
        self.owners.iter().any(|o| o == principal)
    }

    /// Fail with [`VaultError::Unauthorized`] unless the caller is an owner
    pub fn ensure_owner(&self, caller: &str) -> Result<(), VaultError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized(caller.to_string()))
        }
    }

    /// Get the quorum (M)
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Get the owner count (N)
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Owners in registration order
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.quorum, self.owners.len())
    }

    /// Deterministic custody address for this owner set
    ///
    /// Address = Base58Check(version || RIPEMD160(SHA256(quorum || sorted owners)))
    pub fn address(&self) -> String {
        let mut sorted = self.owners.clone();
        sorted.sort();

        let mut script_data = (self.quorum as u32).to_be_bytes().to_vec();
        for owner in &sorted {
            script_data.extend_from_slice(owner.as_bytes());
            script_data.push(0);
        }

        let mut ripemd = Ripemd160::new();
        ripemd.update(sha256(&script_data));
        let ripemd_hash = ripemd.finalize();

        let mut address_bytes = vec![ADDRESS_VERSION];
        address_bytes.extend_from_slice(&ripemd_hash);

        let checksum = double_sha256(&address_bytes);
        address_bytes.extend_from_slice(&checksum[..4]);

        bs58::encode(address_bytes).into_string()
    }
}
