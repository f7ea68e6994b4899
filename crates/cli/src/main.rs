//! Washline CLI - Migrations, seeding and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the document table
//! wl-cli migrate
//!
//! # Load the bundled demo data, or a file of your own
//! wl-cli seed
//! wl-cli seed --file fixtures.yaml
//!
//! # Inspect and maintain clients and contacts
//! wl-cli clients list
//! wl-cli clients show <id>
//! wl-cli clients delete <id>
//! wl-cli contacts list --unassigned
//!
//! # Audit client/contact references
//! wl-cli check
//! ```
//!
//! Configuration comes from `WASHLINE_*` environment variables (or `.env`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use washline_store::{EntityStore, LogFormat, StoreConfig};

mod commands;

#[derive(Parser)]
#[command(name = "wl-cli")]
#[command(author, version, about = "Washline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load clients, contacts and services from YAML
    Seed {
        /// Seed file (defaults to the bundled demo data)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// User id recorded as `createdBy`
        #[arg(long, default_value = "seed")]
        actor: String,
    },
    /// Inspect and maintain clients
    Clients {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Inspect contacts
    Contacts {
        #[command(subcommand)]
        action: ContactAction,
    },
    /// Audit client/contact references (read-only)
    Check,
}

#[derive(Subcommand)]
enum ClientAction {
    /// List all clients
    List,
    /// Show a client with its contacts and jobs
    Show { id: String },
    /// Delete a client and release its contacts
    Delete { id: String },
}

#[derive(Subcommand)]
enum ContactAction {
    /// List contacts
    List {
        /// Only contacts without a client
        #[arg(long)]
        unassigned: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = StoreConfig::from_env();

    init_tracing(
        config
            .as_ref()
            .map_or(LogFormat::Pretty, |config| config.log_format),
    );

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Defaults to info level for our crates if `RUST_LOG` is not set.
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "washline_cli=info,washline_store=info".into());

    let json_layer = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (format == LogFormat::Pretty).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli, config: StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run(&config).await?,
        command => {
            let store = EntityStore::connect(&config).await?;
            run_with_store(command, &store).await?;
        }
    }
    Ok(())
}

async fn run_with_store(
    command: Commands,
    store: &EntityStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        // Runs before a store is connected.
        Commands::Migrate => {}
        Commands::Seed { file, actor } => {
            commands::seed::run(store, file.as_deref(), &actor).await?;
        }
        Commands::Clients { action } => match action {
            ClientAction::List => commands::clients::list(store).await?,
            ClientAction::Show { id } => commands::clients::show(store, &id).await?,
            ClientAction::Delete { id } => commands::clients::delete(store, &id).await?,
        },
        Commands::Contacts { action } => match action {
            ContactAction::List { unassigned } => {
                commands::contacts::list(store, unassigned).await?;
            }
        },
        Commands::Check => commands::check::run(store).await?,
    }
    Ok(())
}
