//! Contact inspection commands.

use tracing::info;
use washline_store::{EntityStore, StoreError};

/// Log every contact, or only those without a client.
///
/// # Errors
///
/// Returns `StoreError` if the contacts cannot be read.
pub async fn list(store: &EntityStore, unassigned: bool) -> Result<(), StoreError> {
    let contacts = if unassigned {
        store.contacts().list_unassigned_contacts().await?
    } else {
        store.contacts().list_contacts().await?
    };

    info!("Contacts ({})", contacts.len());
    for contact in &contacts {
        let owner = contact
            .client_id
            .as_ref()
            .map_or("unassigned", |id| id.as_str());
        info!("  {}  {} [{}] client: {owner}", contact.id, contact.name, contact.contact_type);
    }
    Ok(())
}
