use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::api;
use crate::application::{LedgerConfig, LedgerService};
use crate::domain::{format_cents, format_timestamp, Cents, Wallet};
use crate::storage::SqliteStore;

/// Coffer - Ledger-backed wallet service
#[derive(Parser)]
#[command(name = "coffer")]
#[command(about = "A wallet service with an append-only, hash-verified transaction log")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "COFFER_DATABASE", default_value = "coffer.db")]
    pub database: String,

    /// Deadline for a single ledger operation, in milliseconds
    #[arg(long, env = "COFFER_OPERATION_TIMEOUT_MS", default_value_t = 5000)]
    pub operation_timeout_ms: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "COFFER_LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, env = "COFFER_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// Deposit into a wallet, creating it if needed
    Deposit {
        username: String,

        /// Amount in minor units (e.g. 1000 for 10.00)
        amount: Cents,
    },

    /// Withdraw from an existing wallet
    Withdraw {
        username: String,

        /// Amount in minor units
        amount: Cents,
    },

    /// Transfer between two existing wallets
    Transfer {
        /// Amount in minor units
        amount: Cents,

        /// Sending wallet
        #[arg(long)]
        from: String,

        /// Receiving wallet
        #[arg(long)]
        to: String,
    },

    /// Show balance for a wallet or all wallets
    Balance {
        /// Username (omit for all wallets)
        username: Option<String>,
    },

    /// List logged transactions, newest first
    Transactions {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        counterparty: Option<String>,

        /// deposit, withdraw, transfer_in or transfer_out
        #[arg(long = "type")]
        kind: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<String>,
    },

    /// Recompute every transaction hash and report mismatches
    Verify,
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_operation_timeout(Duration::from_millis(self.operation_timeout_ms))
    }

    async fn connect(&self) -> Result<LedgerService> {
        let store = SqliteStore::connect(&self.database).await?;
        Ok(LedgerService::with_config(store, self.config()))
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve { bind } => {
                let store = SqliteStore::init(&self.database).await?;
                let service = LedgerService::with_config(store, self.config());
                run_server(service, bind).await?;
            }

            Commands::Deposit { username, amount } => {
                let service = self.connect().await?;
                let wallet = service.deposit(username, *amount).await?;
                println!(
                    "Deposited {} into {}: balance {}",
                    format_cents(*amount),
                    wallet.username,
                    format_cents(wallet.balance)
                );
            }

            Commands::Withdraw { username, amount } => {
                let service = self.connect().await?;
                let wallet = service.withdraw(username, *amount).await?;
                println!(
                    "Withdrew {} from {}: balance {}",
                    format_cents(*amount),
                    wallet.username,
                    format_cents(wallet.balance)
                );
            }

            Commands::Transfer { amount, from, to } => {
                let service = self.connect().await?;
                let result = service.transfer(from, to, *amount).await?;
                println!(
                    "Transferred {} {} -> {}",
                    format_cents(*amount),
                    result.wallet.username,
                    result.counterparty.username
                );
                println!(
                    "  {:<20} {:>12}",
                    result.wallet.username,
                    format_cents(result.wallet.balance)
                );
                println!(
                    "  {:<20} {:>12}",
                    result.counterparty.username,
                    format_cents(result.counterparty.balance)
                );
            }

            Commands::Balance { username } => {
                let service = self.connect().await?;
                run_balance_command(&service, username.as_deref()).await?;
            }

            Commands::Transactions {
                username,
                counterparty,
                kind,
                limit,
            } => {
                let service = self.connect().await?;
                run_transactions_command(
                    &service,
                    username.as_deref(),
                    counterparty.as_deref(),
                    kind.as_deref(),
                    limit.as_deref(),
                )
                .await?;
            }

            Commands::Verify => {
                let service = self.connect().await?;
                run_verify_command(&service).await?;
            }
        }

        Ok(())
    }
}

async fn run_server(service: LedgerService, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!(address = %bind, "Listening");

    axum::serve(listener, api::router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

fn print_wallet_table(wallets: &[Wallet]) {
    println!("{:<20} {:>12} {:>12} {:>12}", "USERNAME", "BALANCE", "LAST IN", "LAST OUT");
    println!("{}", "-".repeat(59));
    for wallet in wallets {
        println!(
            "{:<20} {:>12} {:>12} {:>12}",
            wallet.username,
            format_cents(wallet.balance),
            wallet.last_deposit_amount.map(format_cents).unwrap_or_else(|| "-".into()),
            wallet.last_withdraw_amount.map(format_cents).unwrap_or_else(|| "-".into()),
        );
    }
}

async fn run_balance_command(service: &LedgerService, username: Option<&str>) -> Result<()> {
    match username {
        Some(name) => {
            let wallet = service.get_wallet(name).await?;
            println!("{}: {}", wallet.username, format_cents(wallet.balance));
        }
        None => {
            let wallets = service.list_wallets().await?;
            if wallets.is_empty() {
                println!("No wallets found.");
            } else {
                print_wallet_table(&wallets);
            }
        }
    }
    Ok(())
}

async fn run_transactions_command(
    service: &LedgerService,
    username: Option<&str>,
    counterparty: Option<&str>,
    kind: Option<&str>,
    limit: Option<&str>,
) -> Result<()> {
    let (transactions, criteria) = service
        .query_transactions(username, counterparty, kind, limit)
        .await?;

    println!("Criteria: {}", serde_json::to_string(&criteria)?);
    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:>6}  {:<27} {:<14} {:<16} {:>12} {:<16}",
        "ID", "TIMESTAMP", "TYPE", "USERNAME", "AMOUNT", "COUNTERPARTY"
    );
    println!("{}", "-".repeat(96));
    for t in &transactions {
        println!(
            "{:>6}  {:<27} {:<14} {:<16} {:>12} {:<16}",
            t.id,
            format_timestamp(&t.timestamp),
            t.kind.as_str(),
            t.username,
            format_cents(t.amount),
            t.counterparty.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_verify_command(service: &LedgerService) -> Result<()> {
    println!("Verifying transaction hashes...\n");

    let report = service.verify_ledger().await?;
    println!("Transactions checked: {}", report.checked);

    if report.is_clean() {
        println!("Ledger is consistent.");
        Ok(())
    } else {
        println!("Hash mismatches:");
        for id in &report.tampered {
            println!("  - transaction {}", id);
        }
        anyhow::bail!("Ledger verification failed");
    }
}
