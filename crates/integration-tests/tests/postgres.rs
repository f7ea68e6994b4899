//! The reference protocol against `PostgreSQL`.
//!
//! These tests require a database reachable through
//! `WASHLINE_TEST_DATABASE_URL`. Migrations run on connect. Every test works
//! on freshly generated ids, so a shared database is fine.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use washline_integration_tests::{create_contact, test_database_url};
use washline_store::EntityStore;
use washline_store::db::{PgDocumentStore, create_pool};
use washline_store::models::{ClientInput, ClientUpdate};

async fn postgres_store() -> EntityStore {
    let url = test_database_url().expect("WASHLINE_TEST_DATABASE_URL not set");
    let pool = create_pool(&SecretString::from(url), 5, Duration::from_secs(5))
        .await
        .expect("Failed to connect to test database");

    let backend = PgDocumentStore::new(pool);
    backend.migrate().await.expect("Failed to run migrations");
    EntityStore::new(Arc::new(backend))
}

#[tokio::test]
#[ignore = "Requires WASHLINE_TEST_DATABASE_URL"]
async fn test_client_lifecycle() {
    let store = postgres_store().await;
    let c1 = create_contact(&store, "Ana").await;
    let c2 = create_contact(&store, "Ben").await;
    let c3 = create_contact(&store, "Chloe").await;

    let client = store
        .clients()
        .create_client(ClientInput {
            name: "Harbor Hotel".to_string(),
            contacts: vec![c1.id.clone(), c2.id.clone()],
            ..ClientInput::default()
        })
        .await
        .unwrap();
    for id in [&c1.id, &c2.id] {
        let contact = store.contacts().get_contact(id).await.unwrap();
        assert_eq!(contact.client_id.as_ref(), Some(&client.id));
    }

    let updated = store
        .clients()
        .update_client(&client.id, ClientUpdate::contacts([c2.id.clone(), c3.id.clone()]))
        .await
        .unwrap();
    assert_eq!(updated.contacts, vec![c2.id.clone(), c3.id.clone()]);
    assert_eq!(store.contacts().get_contact(&c1.id).await.unwrap().client_id, None);

    let listed = store.contacts().list_client_contacts(&client.id).await.unwrap();
    let names: Vec<_> = listed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Ben", "Chloe"]);

    store.clients().delete_client(&client.id).await.unwrap();
    assert!(store.clients().get_client(&client.id).await.unwrap_err().is_not_found());
    for id in [&c2.id, &c3.id] {
        assert_eq!(store.contacts().get_contact(id).await.unwrap().client_id, None);
    }
}

#[tokio::test]
#[ignore = "Requires WASHLINE_TEST_DATABASE_URL"]
async fn test_missing_contact_rolls_back() {
    let store = postgres_store().await;
    let c1 = create_contact(&store, "Ana").await;

    let err = store
        .clients()
        .create_client(ClientInput {
            name: "Ghost Hotel".to_string(),
            contacts: vec![c1.id.clone(), "missing-contact".into()],
            ..ClientInput::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, washline_store::StoreError::OperationFailed(_)));
    assert_eq!(store.contacts().get_contact(&c1.id).await.unwrap().client_id, None);
}

#[tokio::test]
#[ignore = "Requires WASHLINE_TEST_DATABASE_URL"]
async fn test_parallel_updates_serialize() {
    let store = postgres_store().await;
    let a = create_contact(&store, "Ana").await;
    let b = create_contact(&store, "Ben").await;
    let client = store
        .clients()
        .create_client(ClientInput {
            name: "Riverside Clinic".to_string(),
            contacts: vec![a.id.clone()],
            ..ClientInput::default()
        })
        .await
        .unwrap();

    let clients = store.clients();
    let (one, two) = tokio::join!(
        clients.update_client(&client.id, ClientUpdate::contacts([a.id.clone()])),
        clients.update_client(&client.id, ClientUpdate::contacts([b.id.clone()])),
    );
    one.unwrap();
    two.unwrap();

    let stored = store.clients().get_client(&client.id).await.unwrap();
    for contact in store.contacts().list_client_contacts(&client.id).await.unwrap() {
        assert_eq!(contact.client_id.as_ref(), Some(&stored.id));
    }
    for id in [&a.id, &b.id] {
        let contact = store.contacts().get_contact(id).await.unwrap();
        assert_eq!(
            contact.client_id.as_ref() == Some(&client.id),
            stored.contacts.contains(id)
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires WASHLINE_TEST_DATABASE_URL"]
async fn test_contact_delete_races_client_update() {
    let store = postgres_store().await;

    for _ in 0..20 {
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

        let (contacts, clients) = (store.contacts(), store.clients());
        let (deleted, updated) = tokio::join!(
            contacts.delete_contact(&k.id),
            clients.update_client(&client.id, ClientUpdate::contacts([a.id.clone()])),
        );
        deleted.unwrap();
        assert_eq!(updated.unwrap().contacts, vec![a.id.clone()]);

        let stored = store.clients().get_client(&client.id).await.unwrap();
        assert_eq!(stored.contacts, vec![a.id.clone()]);
        assert!(store.contacts().get_contact(&k.id).await.unwrap_err().is_not_found());
    }
}
