//! Seed the store with clients, contacts and services from YAML.
//!
//! Without `--file` the bundled `seed/demo.yaml` is loaded.

use std::path::Path;

use tracing::info;
use washline_core::{Actor, UserId};
use washline_store::{EntityStore, SeedFile, load_seed};

const DEMO_SEED: &str = include_str!("../../seed/demo.yaml");

/// Load a seed file into the store.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, references an
/// unknown contact key, or a store write fails.
pub async fn run(
    store: &EntityStore,
    file: Option<&Path>,
    actor: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = match file {
        Some(path) => {
            if !path.exists() {
                return Err(format!("File not found: {}", path.display()).into());
            }
            info!(path = %path.display(), "Loading seed data from file");
            tokio::fs::read_to_string(path).await?
        }
        None => {
            info!("Loading bundled demo seed data");
            DEMO_SEED.to_string()
        }
    };

    let seed = SeedFile::from_yaml(&content)?;
    info!(
        services = seed.services.len(),
        contacts = seed.contacts.len(),
        clients = seed.clients.len(),
        "Parsed seed file"
    );

    let actor = Actor::new(UserId::from(actor));
    let summary = load_seed(store, &actor, seed).await?;

    info!("Seeding complete!");
    info!("  Services created: {}", summary.services);
    info!("  Contacts created: {}", summary.contacts);
    info!("  Clients created: {}", summary.clients);
    Ok(())
}
