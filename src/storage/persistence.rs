//! Vault persistence layer
//!
//! Saves the complete vault state (owners, quorum, transaction log,
//! confirmation matrix, custody balance, audit log) as one JSON document.

use crate::multisig::MultisigVault;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub vault_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".vault_data"),
            vault_file: "vault.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Vault storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Get the vault file path
    pub fn vault_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.vault_file)
    }

    /// Get a backup file path
    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.vault_file, index))
    }

    /// Save the vault to disk
    pub fn save(&self, vault: &MultisigVault) -> Result<(), StorageError> {
        let path = self.vault_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.vault_file));
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, vault)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::debug!("Vault saved to {:?}", path);
        Ok(())
    }

    /// Load the vault from disk
    pub fn load(&self) -> Result<MultisigVault, StorageError> {
        let path = self.vault_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Vault file not found".to_string(),
            ));
        }

        read_vault(&path)
    }

    /// Check if a saved vault exists
    pub fn exists(&self) -> bool {
        self.vault_path().exists()
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<MultisigVault, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        read_vault(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.vault_path();

        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

/// Read a vault file and check its invariants
fn read_vault(path: &Path) -> Result<MultisigVault, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let vault: MultisigVault = serde_json::from_reader(reader)?;

    vault
        .validate()
        .map_err(|e| StorageError::InvalidData(e.to_string()))?;

    Ok(vault)
}

/// Save vault to a specific file path
pub fn save_to_file(vault: &MultisigVault, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, vault)?;
    Ok(())
}

/// Load vault from a specific file path
pub fn load_from_file(path: &Path) -> Result<MultisigVault, StorageError> {
    read_vault(path)
}
