//! CLI commands for the vault
//!
//! Implements all command handlers for the CLI interface. Each mutating
//! command loads the vault, applies one operation and saves it back.

use crate::multisig::{parse_amount, MultisigVault, TransactionSnapshot};
use crate::storage::{Storage, StorageConfig};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub vault: MultisigVault,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load application state from an initialized data directory
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = Storage::new(StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        })?;

        if !storage.exists() {
            return Err(format!(
                "No vault found at {:?}. Create one with: vault init --owner <ID> --quorum <N>",
                data_dir
            )
            .into());
        }

        let vault = storage.load()?;

        Ok(Self {
            vault,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.vault)?;
        Ok(())
    }
}

/// Decode an optional hex payload (with or without a `0x` prefix)
pub fn parse_payload(data: Option<&str>) -> CliResult<Vec<u8>> {
    match data {
        None => Ok(Vec::new()),
        Some(hex_str) => {
            let trimmed = hex_str.trim_start_matches("0x");
            Ok(hex::decode(trimmed).map_err(|e| format!("Invalid payload hex: {}", e))?)
        }
    }
}

fn print_transaction(tx: &TransactionSnapshot, quorum: usize) {
    println!("📄 Transaction #{}", tx.index);
    println!("   ├─ Status: {:?}", tx.status);
    println!("   ├─ Proposer: {}", tx.proposer);
    println!("   ├─ Destination: {}", tx.destination);
    println!("   ├─ Amount: {}", tx.amount);
    println!("   ├─ Digest: {}", tx.digest);
    if !tx.payload.is_empty() {
        println!("   ├─ Payload: 0x{}", tx.payload);
    }
    println!(
        "   ├─ Confirmations: {}/{} {:?}",
        tx.confirmation_count, quorum, tx.confirmed_by
    );
    println!(
        "   └─ Created: {}",
        tx.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

/// Initialize a new vault (bootstrap glue: fixes owners and quorum)
pub fn cmd_init(data_dir: &Path, owners: Vec<String>, quorum: usize) -> CliResult<()> {
    let storage = Storage::new(StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    })?;

    if storage.exists() {
        println!("⚠️  Vault already exists at {:?}", data_dir);
        println!("   The owner set is immutable; use a new data directory for a new vault");
        return Ok(());
    }

    let vault = MultisigVault::new(owners, quorum)?;
    storage.save(&vault)?;

    println!("✅ Vault initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🔐 Policy: {}", vault.registry().description());
    println!("   📍 Address: {}", vault.registry().address());
    for owner in vault.owners() {
        println!("   👤 {}", owner);
    }

    Ok(())
}

/// Display vault info
pub fn cmd_info(state: &AppState) -> CliResult<()> {
    let vault = &state.vault;

    println!("🏦 Vault Info");
    println!("   ├─ Address: {}", vault.registry().address());
    println!("   ├─ Policy: {}", vault.registry().description());
    println!("   ├─ Owners: {}", vault.owners().join(", "));
    println!("   ├─ Balance: {}", vault.balance());
    println!("   ├─ Transactions: {}", vault.transaction_count());
    println!("   ├─ Pending: {}", vault.pending_transactions().len());
    println!("   └─ Paid out: {}", vault.custody().total_paid_out());

    for (destination, amount) in vault.custody().payouts() {
        println!("      └─ {}: {}", destination, amount);
    }

    let stats = state.storage.stats()?;
    println!(
        "\n   💾 {} bytes in {:?} ({} backups)",
        stats.file_size, stats.data_dir, stats.backup_count
    );

    Ok(())
}

/// Deposit funds (anyone)
pub fn cmd_deposit(state: &mut AppState, from: &str, amount: i64) -> CliResult<()> {
    let amount = parse_amount(amount)?;
    let balance = state.vault.deposit(from, amount)?;
    state.save()?;

    println!("💰 Deposited {} from {}", amount, from);
    println!("   New balance: {}", balance);

    Ok(())
}

/// Propose a transfer
pub fn cmd_submit(
    state: &mut AppState,
    caller: &str,
    to: &str,
    amount: i64,
    data: Option<&str>,
) -> CliResult<()> {
    let amount = parse_amount(amount)?;
    let payload = parse_payload(data)?;
    let index = state.vault.propose(caller, to, amount, payload)?;
    state.save()?;

    println!("📤 Transaction #{} proposed", index);
    println!("   To: {}", to);
    println!("   Amount: {}", amount);
    println!(
        "   Needs {} confirmation(s) before execution",
        state.vault.quorum()
    );

    Ok(())
}

/// Confirm a transaction
pub fn cmd_confirm(state: &mut AppState, caller: &str, index: u64) -> CliResult<()> {
    state.vault.confirm(caller, index)?;
    state.save()?;

    let count = state.vault.confirmation_count(index)?;
    println!("✍️  {} confirmed transaction #{}", caller, index);
    println!("   Confirmations: {}/{}", count, state.vault.quorum());
    if state.vault.can_execute(caller, index).is_ok() {
        println!("   ✅ Ready to execute");
    }

    Ok(())
}

/// Revoke a confirmation
pub fn cmd_revoke(state: &mut AppState, caller: &str, index: u64) -> CliResult<()> {
    state.vault.revoke(caller, index)?;
    state.save()?;

    let count = state.vault.confirmation_count(index)?;
    println!("↩️  {} revoked confirmation of transaction #{}", caller, index);
    println!("   Confirmations: {}/{}", count, state.vault.quorum());

    Ok(())
}

/// Execute a transaction
pub fn cmd_execute(state: &mut AppState, caller: &str, index: u64) -> CliResult<()> {
    state.vault.execute(caller, index)?;
    state.save()?;

    let tx = state.vault.get(index)?;
    println!("🚀 Transaction #{} executed by {}", index, caller);
    println!("   Sent {} to {}", tx.amount, tx.destination);
    println!("   Remaining balance: {}", state.vault.balance());

    Ok(())
}

/// Show one transaction
pub fn cmd_show(state: &AppState, index: u64) -> CliResult<()> {
    let tx = state.vault.get(index)?;
    print_transaction(&tx, state.vault.quorum());

    println!("\n   History:");
    for record in state.vault.audit().for_transaction(index) {
        println!(
            "   {} | {} | {}",
            record.sequence,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.event.name()
        );
    }
    Ok(())
}

/// List transactions
pub fn cmd_list(state: &AppState, pending_only: bool) -> CliResult<()> {
    let transactions = if pending_only {
        state.vault.pending_transactions()
    } else {
        state.vault.transactions()
    };

    if transactions.is_empty() {
        println!("📭 No transactions");
        return Ok(());
    }

    println!("📋 Transactions:");
    for tx in &transactions {
        println!(
            "   #{} | {:?} | {} -> {} | {}/{} confirmations",
            tx.index,
            tx.status,
            tx.amount,
            tx.destination,
            tx.confirmation_count,
            state.vault.quorum()
        );
    }

    Ok(())
}

/// Show the audit log tail
pub fn cmd_events(state: &AppState, count: usize) -> CliResult<()> {
    let records = state.vault.audit().tail(count);

    if records.is_empty() {
        println!("📭 No events recorded");
        return Ok(());
    }

    println!("🧾 Events:");
    for record in records {
        println!(
            "   {} | {} | {}",
            record.sequence,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            serde_json::to_string(&record.event)?
        );
    }

    Ok(())
}

/// Export vault state to file
pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(&state.vault, path)?;
    println!("📦 Vault exported to {:?}", path);
    Ok(())
}

/// Import vault state from file (validated before replacing current state)
pub fn cmd_import(state: &mut AppState, path: &Path) -> CliResult<()> {
    let vault = crate::storage::load_from_file(path)?;

    if vault.registry() != state.vault.registry() {
        return Err(format!(
            "Imported vault at {:?} has a different owner set ({}); refusing to replace",
            path,
            vault.registry().description()
        )
        .into());
    }

    state.vault = vault;
    state.save()?;

    println!("📥 Vault imported from {:?}", path);
    println!("   Transactions: {}", state.vault.transaction_count());

    Ok(())
}

/// Roll the vault back to a rotating backup (validated like any load)
pub fn cmd_restore(state: &mut AppState, backup: usize) -> CliResult<()> {
    let available = state.storage.list_backups();
    if !available.contains(&backup) {
        return Err(format!("Backup {} not found; available: {:?}", backup, available).into());
    }

    let vault = state.storage.restore_backup(backup)?;
    let replaced = state.vault.transaction_count();
    state.vault = vault;
    state.save()?;

    println!("⏪ Restored backup {}", backup);
    println!(
        "   Transactions: {} (was {})",
        state.vault.transaction_count(),
        replaced
    );
    println!("   Balance: {}", state.vault.balance());

    Ok(())
}
