//! draftsync CLI
//!
//! Inspects a persistent draft substrate and runs a two-tab demo.

#![allow(clippy::print_stdout)]

mod demo;
mod inspect;

use std::sync::Arc;

use application::{DraftStore, LockManager, SnapshotStore};
use chrono::Utc;
use clap::{Parser, Subcommand};
use domain::{DraftId, TabId};
use infrastructure::{AppConfig, LoggingConfig, Storage, StorageBackend, init_logging};
use tracing::warn;

/// draftsync CLI
#[derive(Parser)]
#[command(name = "draftsync")]
#[command(author, version, about = "Local-first draft coordination", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (extension optional)
    #[arg(short, long, default_value = infrastructure::config::DEFAULT_CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored drafts, most recently updated first
    List,

    /// Print one draft as JSON
    Show {
        /// Draft ID
        id: DraftId,
    },

    /// List the snapshots kept for a draft
    Snapshots {
        /// Draft ID
        id: DraftId,
    },

    /// Show who holds the editing lock on a draft
    Lock {
        /// Draft ID
        id: DraftId,
    },

    /// Run two editing sessions against one draft and print what happens
    ///
    /// Uses the configured backend, so `list` can inspect the result afterwards.
    Demo,

    /// Print the effective configuration as TOML
    Config,
}

/// Determine log filter from verbosity count, `None` to keep the configured one
const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn logging_config(config: &AppConfig, verbose: u8) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if let Some(filter) = log_filter_from_verbosity(verbose) {
        logging.filter = filter.to_string();
    }
    logging
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&logging_config(&config, cli.verbose))?;

    if let Commands::Config = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let settings = config.draft_settings()?;
    if config.storage.backend == StorageBackend::Memory {
        warn!("Memory backend selected; nothing persists between runs");
    }
    let storage = Storage::open(&config.storage)?;

    // Inspection acts as a tab of its own that never writes
    let store = storage.context();
    let drafts = DraftStore::new(Arc::clone(&store));

    match cli.command {
        Commands::List => {
            print!("{}", inspect::render_list(&drafts.list_drafts()));
        },

        Commands::Show { id } => match drafts.get_draft(&id) {
            Some(draft) => println!("{}", inspect::render_draft(&draft)?),
            None => anyhow::bail!("Draft {id} not found"),
        },

        Commands::Snapshots { id } => {
            let snapshots = SnapshotStore::new(store, settings.max_snapshots);
            print!(
                "{}",
                inspect::render_snapshots(&snapshots.get_draft_snapshots(&id))
            );
        },

        Commands::Lock { id } => {
            let ttl = settings.lock_ttl_chrono();
            let locks = LockManager::new(store, TabId::new(), ttl);
            print!(
                "{}",
                inspect::render_lock(locks.get_draft_lock(&id).as_ref(), Utc::now(), ttl)
            );
        },

        Commands::Demo => demo::run(&storage, settings).await?,

        Commands::Config => {},
    }

    Ok(())
}
