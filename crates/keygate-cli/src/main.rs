//! Operator CLI for keygate
//!
//! Drives every key ledger operation from the command line against a data
//! directory of `keys.json`, `claims.json` and `requests.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use keygate_ledger::KeyLedger;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod format;

use commands::{claims, keys, settings};

#[derive(Parser)]
#[command(name = "keygate")]
#[command(about = "keygate - license key pool and claim ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "keygate.toml")]
    config: PathBuf,

    /// Directory holding the documents (overrides DATA_DIR and the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add keys; each argument may hold several, separated by commas or newlines
    Add {
        /// Keys to add
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// List available keys
    Keys,

    /// Remove a key from the pool and from any claim holding it
    Remove {
        /// Key to remove
        key: String,
    },

    /// List claims with dates
    Claims,

    /// Show one identity's claim
    Show {
        /// Identity to look up
        identity: String,
    },

    /// Request a key for an identity, checking eligibility first
    Try {
        /// Identity asking for a key
        identity: String,

        /// Account creation or community join time (RFC 3339), per the mode
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },

    /// Revoke an identity's claim
    Revoke {
        /// Identity whose claim is revoked
        identity: String,

        /// Do not return the key to the pool
        #[arg(long)]
        keep: bool,
    },

    /// Bind a specific key to an identity
    Assign {
        /// Identity receiving the key
        identity: String,

        /// Key to bind
        key: String,
    },

    /// Show or change the eligibility config
    Config {
        /// Minimum age in days
        #[arg(long)]
        min_days: Option<u32>,

        /// Reference time to measure: account or guild
        #[arg(long)]
        mode: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file_config = config::load_config(&cli.config)?;
    let data_dir = config::resolve_data_dir(
        cli.data_dir,
        std::env::var_os(config::DATA_DIR_ENV),
        &file_config,
    );
    tracing::debug!(data_dir = %data_dir.display(), "opening key ledger");
    let ledger = KeyLedger::open_in_dir(&data_dir)
        .await
        .with_context(|| format!("failed to open key ledger in {}", data_dir.display()))?;

    match cli.command {
        Commands::Add { keys } => keys::add(&ledger, &keys).await?,
        Commands::Keys => keys::list(&ledger),
        Commands::Remove { key } => keys::remove(&ledger, &key).await?,
        Commands::Claims => claims::list(&ledger),
        Commands::Show { identity } => claims::show(&ledger, &identity),
        Commands::Try { identity, since } => claims::request(&ledger, &identity, since).await?,
        Commands::Revoke { identity, keep } => claims::revoke(&ledger, &identity, !keep).await?,
        Commands::Assign { identity, key } => claims::assign(&ledger, &identity, &key).await?,
        Commands::Config { min_days, mode } => settings::run(&ledger, min_days, mode).await?,
    }

    Ok(())
}
