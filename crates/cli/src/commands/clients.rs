//! Client inspection and maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! wl-cli clients list
//! wl-cli clients show <id>
//! wl-cli clients delete <id>
//! ```

use tracing::info;
use washline_core::ClientId;
use washline_store::{EntityStore, StoreError};

/// Log every client with its contact count.
///
/// # Errors
///
/// Returns `StoreError` if the clients cannot be read.
pub async fn list(store: &EntityStore) -> Result<(), StoreError> {
    let clients = store.clients().list_clients().await?;
    info!("Clients ({})", clients.len());
    for client in &clients {
        info!(
            "  {}  {} [{}] contacts: {}",
            client.id,
            client.name,
            client.client_type,
            client.contacts.len()
        );
    }
    Ok(())
}

/// Log one client with its contacts and jobs.
///
/// # Errors
///
/// Returns `StoreError::NotFound` if the client does not exist.
pub async fn show(store: &EntityStore, id: &str) -> Result<(), StoreError> {
    let id = ClientId::from(id);
    let client = store.clients().get_client(&id).await?;
    let contacts = store.contacts().list_client_contacts(&id).await?;
    let jobs = store.jobs().list_jobs_for_client(&id).await?;

    info!("{} ({})", client.name, client.id);
    info!("  Type: {}", client.client_type);
    if let Some(email) = &client.email {
        info!("  Email: {email}");
    }
    if let Some(phone) = &client.phone {
        info!("  Phone: {phone}");
    }
    info!("  Created: {}", client.timestamp.created_at);
    info!("  Updated: {}", client.timestamp.updated_at);
    info!("  Contacts ({}):", contacts.len());
    for contact in &contacts {
        info!("    {}  {} [{}]", contact.id, contact.name, contact.contact_type);
    }
    info!("  Jobs ({}):", jobs.len());
    for job in &jobs {
        info!("    {}  {} [{}]", job.id, job.title, job.status);
    }
    Ok(())
}

/// Delete a client, releasing its contacts.
///
/// # Errors
///
/// Returns `StoreError::NotFound` if the client does not exist.
pub async fn delete(store: &EntityStore, id: &str) -> Result<(), StoreError> {
    let id = ClientId::from(id);
    let client = store.clients().get_client(&id).await?;
    store.clients().delete_client(&id).await?;
    info!(
        "Deleted client {} ({}), released {} contacts",
        client.name,
        client.id,
        client.contacts.len()
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use washline_store::models::ClientInput;

    use super::*;

    #[tokio::test]
    async fn test_show_and_delete() {
        let store = EntityStore::in_memory();
        let client = store
            .clients()
            .create_client(ClientInput {
                name: "Harbor Hotel".to_string(),
                ..ClientInput::default()
            })
            .await
            .unwrap();

        list(&store).await.unwrap();
        show(&store, client.id.as_str()).await.unwrap();
        delete(&store, client.id.as_str()).await.unwrap();

        assert!(show(&store, client.id.as_str()).await.unwrap_err().is_not_found());
    }
}
