//! Append-only audit log of vault events
//!
//! Operations produce a [`VaultEvent`] on success; the vault stamps it and
//! appends it here. Rejected calls never produce an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something that happened to the vault
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum VaultEvent {
    /// Funds arrived in custody
    Deposit {
        from: String,
        amount: u64,
        balance: u64,
    },
    /// An owner proposed a transfer
    Submit {
        owner: String,
        index: u64,
        destination: String,
        amount: u64,
        payload: String,
    },
    /// An owner confirmed a transfer
    Confirm { owner: String, index: u64 },
    /// An owner withdrew a confirmation
    Revoke { owner: String, index: u64 },
    /// Funds were released to the destination
    Execute {
        owner: String,
        index: u64,
        destination: String,
        amount: u64,
    },
}

impl VaultEvent {
    /// Transaction index this event refers to, if any
    pub fn index(&self) -> Option<u64> {
        match self {
            VaultEvent::Deposit { .. } => None,
            VaultEvent::Submit { index, .. }
            | VaultEvent::Confirm { index, .. }
            | VaultEvent::Revoke { index, .. }
            | VaultEvent::Execute { index, .. } => Some(*index),
        }
    }

    /// Short event name
    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::Deposit { .. } => "Deposit",
            VaultEvent::Submit { .. } => "Submit",
            VaultEvent::Confirm { .. } => "Confirm",
            VaultEvent::Revoke { .. } => "Revoke",
            VaultEvent::Execute { .. } => "Execute",
        }
    }
}

/// A stamped entry in the audit log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRecord {
    /// Position in the log, starting at 1
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: VaultEvent,
}

/// Append-only event history
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Stamp and append an event
    pub fn append(&mut self, event: VaultEvent) -> &AuditRecord {
        let record = AuditRecord {
            sequence: self.records.len() as u64 + 1,
            timestamp: Utc::now(),
            event,
        };
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// All records, oldest first
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// The most recent `count` records, oldest first
    pub fn tail(&self, count: usize) -> &[AuditRecord] {
        let start = self.records.len().saturating_sub(count);
        &self.records[start..]
    }

    /// Most recent record
    pub fn last(&self) -> Option<&AuditRecord> {
        self.records.last()
    }

    /// Records about one transaction
    pub fn for_transaction(&self, index: u64) -> Vec<&AuditRecord> {
        self.records
            .iter()
            .filter(|r| r.event.index() == Some(index))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
