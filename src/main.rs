//! Multisig Vault CLI Application
//!
//! A command-line interface for operating a multi-signature custody vault.

use clap::{Parser, Subcommand};
use multisig_vault::api::{create_router, ApiState, WsBroadcaster};
use multisig_vault::cli::{self, AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "vault")]
#[command(version)]
#[command(about = "A multi-signature custody vault", long_about = None)]
struct Cli {
    /// Data directory for vault storage
    #[arg(short, long, default_value = ".vault_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vault with a fixed owner set
    Init {
        /// Owner identifier (repeat for each owner)
        #[arg(short, long = "owner", required = true)]
        owners: Vec<String>,

        /// Confirmations required before execution
        #[arg(short, long)]
        quorum: usize,
    },

    /// Display vault information
    Info,

    /// Deposit funds into the vault
    Deposit {
        /// Depositing principal
        #[arg(short, long)]
        from: String,

        /// Amount to deposit
        #[arg(short, long, allow_negative_numbers = true)]
        amount: i64,
    },

    /// Propose a transfer
    Submit {
        /// Proposing owner
        #[arg(short, long)]
        caller: String,

        /// Destination principal
        #[arg(short, long)]
        to: String,

        /// Amount to transfer
        #[arg(short, long, allow_negative_numbers = true)]
        amount: i64,

        /// Hex-encoded payload
        #[arg(long)]
        data: Option<String>,
    },

    /// Confirm a pending transaction
    Confirm {
        /// Confirming owner
        #[arg(short, long)]
        caller: String,

        /// Transaction index
        #[arg(short, long)]
        index: u64,
    },

    /// Revoke a confirmation
    Revoke {
        /// Revoking owner
        #[arg(short, long)]
        caller: String,

        /// Transaction index
        #[arg(short, long)]
        index: u64,
    },

    /// Execute a confirmed transaction
    Execute {
        /// Executing owner
        #[arg(short, long)]
        caller: String,

        /// Transaction index
        #[arg(short, long)]
        index: u64,
    },

    /// Show a transaction
    Show {
        /// Transaction index
        #[arg(short, long)]
        index: u64,
    },

    /// List transactions
    List {
        /// Only show pending transactions
        #[arg(long)]
        pending: bool,
    },

    /// Show the audit log
    Events {
        /// Number of recent events to show
        #[arg(short, long, default_value = "20")]
        count: usize,
    },

    /// Export vault state to file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import vault state from file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Replace the vault with one of its rotating backups
    Restore {
        /// Backup number (0 is the most recent)
        #[arg(short, long, default_value = "0")]
        backup: usize,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle init separately (no vault exists yet)
    if let Commands::Init { owners, quorum } = &cli.command {
        return cli::cmd_init(&cli.data_dir, owners.clone(), *quorum);
    }

    // Handle API commands with tokio runtime
    if let Commands::Api { ref action } = cli.command {
        return run_api_command(action, &cli.data_dir);
    }

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),
        Commands::Api { .. } => unreachable!(),

        Commands::Info => cli::cmd_info(&state)?,

        Commands::Deposit { from, amount } => {
            cli::cmd_deposit(&mut state, &from, amount)?;
        }

        Commands::Submit {
            caller,
            to,
            amount,
            data,
        } => {
            cli::cmd_submit(&mut state, &caller, &to, amount, data.as_deref())?;
        }

        Commands::Confirm { caller, index } => {
            cli::cmd_confirm(&mut state, &caller, index)?;
        }

        Commands::Revoke { caller, index } => {
            cli::cmd_revoke(&mut state, &caller, index)?;
        }

        Commands::Execute { caller, index } => {
            cli::cmd_execute(&mut state, &caller, index)?;
        }

        Commands::Show { index } => cli::cmd_show(&state, index)?,

        Commands::List { pending } => cli::cmd_list(&state, pending)?,

        Commands::Events { count } => cli::cmd_events(&state, count)?,

        Commands::Export { output } => cli::cmd_export(&state, &output)?,

        Commands::Import { input } => cli::cmd_import(&mut state, &input)?,

        Commands::Restore { backup } => cli::cmd_restore(&mut state, backup)?,
    }

    Ok(())
}

fn run_api_command(
    action: &ApiCommands,
    data_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                let app_state = AppState::new(data_dir.to_path_buf())?;
                let vault = Arc::new(RwLock::new(app_state.vault));
                let storage = Arc::new(app_state.storage);

                let state = ApiState {
                    vault: vault.clone(),
                    storage: storage.clone(),
                    ws_broadcaster: Arc::new(WsBroadcaster::new()),
                };

                let app = create_router(state);
                let addr = format!("0.0.0.0:{}", port);

                {
                    let vault = vault.read().await;
                    println!("🚀 Vault API server starting on http://localhost:{}", port);
                    println!(
                        "   🔐 {} vault at {}",
                        vault.registry().description(),
                        vault.registry().address()
                    );
                }

                println!();
                println!("📖 Available endpoints:");
                println!("   GET  /health                               - Health check");
                println!("   GET  /ws                                   - WebSocket events");
                println!("   GET  /api/vault                            - Vault info");
                println!("   GET  /api/balance                          - Balance");
                println!("   POST /api/deposit                          - Deposit funds");
                println!("   GET  /api/events                           - Audit log");
                println!("   GET  /api/transactions                     - List transactions");
                println!("   POST /api/transactions                     - Propose transfer");
                println!("   GET  /api/transactions/{{index}}             - Get transaction");
                println!("   POST /api/transactions/{{index}}/confirm     - Confirm");
                println!("   POST /api/transactions/{{index}}/revoke      - Revoke");
                println!("   POST /api/transactions/{{index}}/execute     - Execute");
                println!();

                // Handle Ctrl+C with a final save
                tokio::spawn(async move {
                    tokio::signal::ctrl_c().await.ok();
                    println!("\n📴 Shutting down API server...");

                    let vault = vault.read().await;
                    match storage.save(&vault) {
                        Ok(()) => println!("✅ Vault saved"),
                        Err(e) => log::error!("Failed to save vault on shutdown: {}", e),
                    }
                    std::process::exit(0);
                });

                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
