//! Writes landing between a repository's read and its commit.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use washline_core::ContactId;
use washline_integration_tests::{InterferingStore, create_contact, memory_store};
use washline_store::db::{Collection, DocumentStore, FieldChanges, MemoryStore, WriteBatch};
use washline_store::models::{Client, ClientInput, ClientUpdate, ContactUpdate};
use washline_store::{EntityStore, StoreError, StoreOptions, audit_references};

/// Seed a client owning one contact plus two spare contacts.
async fn seeded() -> (Arc<MemoryStore>, Client, [ContactId; 3]) {
    let (backend, store) = memory_store();
    let c1 = create_contact(&store, "Ana").await;
    let c2 = create_contact(&store, "Ben").await;
    let c3 = create_contact(&store, "Chloe").await;
    let client = store
        .clients()
        .create_client(ClientInput {
            name: "Harbor Hotel".to_string(),
            contacts: vec![c1.id.clone()],
            ..ClientInput::default()
        })
        .await
        .unwrap();
    (backend, client, [c1.id, c2.id, c3.id])
}

fn set_phone(client_id: &str) -> impl Fn() -> WriteBatch + Send + Sync + 'static {
    let client_id = client_id.to_string();
    move || {
        let mut batch = WriteBatch::new();
        batch.update(
            Collection::Clients,
            client_id.clone(),
            FieldChanges::new().set("phone", "+1 555 0199"),
        );
        batch
    }
}

#[tokio::test]
async fn test_concurrent_field_edit_is_kept() {
    let (backend, client, [c1, _, c3]) = seeded().await;
    let interfering = Arc::new(InterferingStore::new(
        backend,
        1,
        Box::new(set_phone(client.id.as_str())),
    ));
    let store = EntityStore::new(interfering.clone());

    let updated = store
        .clients()
        .update_client(&client.id, ClientUpdate::contacts([c1.clone(), c3.clone()]))
        .await
        .unwrap();

    assert_eq!(interfering.remaining(), 0);
    assert_eq!(updated.phone.as_deref(), Some("+1 555 0199"));
    assert_eq!(updated.contacts, vec![c1, c3.clone()]);
    assert_eq!(
        store.contacts().get_contact(&c3).await.unwrap().client_id.as_ref(),
        Some(&client.id)
    );
    assert!(audit_references(&store).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_concurrent_contact_edit_is_replanned() {
    let (backend, client, [c1, c2, _]) = seeded().await;
    let contact_id = c2.as_str().to_string();
    let interfering = Arc::new(InterferingStore::new(
        backend,
        1,
        Box::new(move || {
            let mut batch = WriteBatch::new();
            batch.update(
                Collection::Contacts,
                contact_id.clone(),
                FieldChanges::new().set("phone", "+1 555 0144"),
            );
            batch
        }),
    ));
    let store = EntityStore::new(interfering.clone());

    store
        .clients()
        .update_client(&client.id, ClientUpdate::contacts([c1, c2.clone()]))
        .await
        .unwrap();

    let contact = store.contacts().get_contact(&c2).await.unwrap();
    assert_eq!(contact.client_id.as_ref(), Some(&client.id));
    assert_eq!(contact.phone.as_deref(), Some("+1 555 0144"));
}

#[tokio::test]
async fn test_delete_releases_contact_attached_concurrently() {
    let (backend, client, [c1, c2, _]) = seeded().await;
    let (client_id, c1_id, c2_id) = (
        client.id.as_str().to_string(),
        c1.as_str().to_string(),
        c2.as_str().to_string(),
    );
    let interfering = Arc::new(InterferingStore::new(
        backend,
        1,
        Box::new(move || {
            let mut batch = WriteBatch::new();
            batch.update(
                Collection::Clients,
                client_id.clone(),
                FieldChanges::new().set("contacts", json!([c1_id, c2_id])),
            );
            batch.update(
                Collection::Contacts,
                c2_id.clone(),
                FieldChanges::new().set("clientId", client_id.clone()),
            );
            batch
        }),
    ));
    let store = EntityStore::new(interfering);

    store.clients().delete_client(&client.id).await.unwrap();

    for id in [&c1, &c2] {
        assert_eq!(store.contacts().get_contact(id).await.unwrap().client_id, None);
    }
    assert!(audit_references(&store).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_removed_contact_deleted_concurrently_is_replanned() {
    let (backend, store) = memory_store();
    let a = create_contact(&store, "Ana").await;
    let k = create_contact(&store, "Ben").await;
    let client = store
        .clients()
        .create_client(ClientInput {
            name: "Harbor Hotel".to_string(),
            contacts: vec![a.id.clone(), k.id.clone()],
            ..ClientInput::default()
        })
        .await
        .unwrap();

    let doomed = k.id.as_str().to_string();
    let interfering = Arc::new(InterferingStore::new(
        backend,
        1,
        Box::new(move || {
            let mut batch = WriteBatch::new();
            batch.delete(Collection::Contacts, doomed.clone());
            batch
        }),
    ));
    let store = EntityStore::new(interfering.clone());

    let updated = store
        .clients()
        .update_client(&client.id, ClientUpdate::contacts([a.id.clone()]))
        .await
        .unwrap();

    assert_eq!(interfering.remaining(), 0);
    assert_eq!(updated.contacts, vec![a.id.clone()]);
    assert!(store.contacts().get_contact(&k.id).await.unwrap_err().is_not_found());
    assert_eq!(
        store.contacts().get_contact(&a.id).await.unwrap().client_id.as_ref(),
        Some(&client.id)
    );
    assert!(audit_references(&store).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_contact_update_keeps_concurrent_edit() {
    let (backend, store) = memory_store();
    let contact = create_contact(&store, "Ana").await;
    let contact_id = contact.id.as_str().to_string();
    let interfering = Arc::new(InterferingStore::new(
        backend,
        1,
        Box::new(move || {
            let mut batch = WriteBatch::new();
            batch.update(
                Collection::Contacts,
                contact_id.clone(),
                FieldChanges::new().set("phone", "+1 555 0123"),
            );
            batch
        }),
    ));
    let store = EntityStore::new(interfering.clone());

    let updated = store
        .contacts()
        .update_contact(
            &contact.id,
            ContactUpdate {
                name: Some("Ana Lima".to_string()),
                ..ContactUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(interfering.remaining(), 0);
    assert_eq!(updated.name, "Ana Lima");
    assert_eq!(updated.phone.as_deref(), Some("+1 555 0123"));
    assert!(updated.timestamp.updated_at >= contact.timestamp.updated_at);
}

#[tokio::test]
async fn test_contact_update_after_concurrent_delete_is_not_found() {
    let (backend, store) = memory_store();
    let contact = create_contact(&store, "Ana").await;
    let contact_id = contact.id.as_str().to_string();
    let interfering = Arc::new(InterferingStore::new(
        backend.clone(),
        1,
        Box::new(move || {
            let mut batch = WriteBatch::new();
            batch.delete(Collection::Contacts, contact_id.clone());
            batch
        }),
    ));
    let store = EntityStore::new(interfering);

    let err = store
        .contacts()
        .update_contact(
            &contact.id,
            ContactUpdate {
                name: Some("Ana Lima".to_string()),
                ..ContactUpdate::default()
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "{err}");
    assert!(backend.get(Collection::Contacts, contact.id.as_str()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_gives_up_after_configured_retries() {
    let (backend, client, [c1, c2, _]) = seeded().await;
    let interfering = Arc::new(InterferingStore::new(
        backend,
        10,
        Box::new(set_phone(client.id.as_str())),
    ));
    let store = EntityStore::with_options(
        interfering.clone(),
        StoreOptions {
            conflict_retries: 2,
        },
    );

    let err = store
        .clients()
        .update_client(&client.id, ClientUpdate::contacts([c1.clone(), c2.clone()]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, StoreError::OperationFailed(ref message) if message.contains("after 3 attempts")),
        "{err}"
    );
    assert_eq!(interfering.remaining(), 7);
    let stored = store.clients().get_client(&client.id).await.unwrap();
    assert_eq!(stored.contacts, vec![c1]);
    assert_eq!(store.contacts().get_contact(&c2).await.unwrap().client_id, None);
}

#[tokio::test]
async fn test_parallel_updates_stay_consistent() {
    let (_, store) = memory_store();
    let a = create_contact(&store, "Ana").await;
    let b = create_contact(&store, "Ben").await;
    let c = create_contact(&store, "Chloe").await;
    let client = store
        .clients()
        .create_client(ClientInput {
            name: "Harbor Hotel".to_string(),
            contacts: vec![a.id.clone()],
            ..ClientInput::default()
        })
        .await
        .unwrap();

    let clients = store.clients();
    let (first, second) = tokio::join!(
        clients.update_client(&client.id, ClientUpdate::contacts([a.id.clone(), b.id.clone()])),
        clients.update_client(&client.id, ClientUpdate::contacts([c.id.clone()])),
    );
    first.unwrap();
    second.unwrap();

    assert!(audit_references(&store).await.unwrap().is_consistent());
}
