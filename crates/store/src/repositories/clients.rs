//! Client repository and the client/contact reference protocol.
//!
//! A client owns an ordered `contacts` list and every listed contact carries
//! `clientId` pointing back. Client writes that change the list write the
//! matching back-references in the same batch. Every document read while
//! planning a batch is written back under a version guard, so a concurrent
//! change makes the commit fail with a conflict and the cycle is re-planned.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use washline_core::{ClientId, ContactId, Timestamps};

use super::{
    StoreOptions, Versioned, commit_with_retry, encode, get_entity, list_entities, name_order,
    patch, patch_clearable, read_entity,
};
use crate::db::{Collection, DocumentStore, FieldChanges, Filter, WriteBatch};
use crate::error::StoreError;
use crate::models::{Client, ClientChanges, ClientInput, ClientUpdate, Contact, NewClient};
use crate::relationship::diff_references;

/// Repository for client documents.
pub struct ClientRepository<'a> {
    backend: &'a dyn DocumentStore,
    options: StoreOptions,
}

impl<'a> ClientRepository<'a> {
    /// Create a new client repository.
    #[must_use]
    pub const fn new(backend: &'a dyn DocumentStore, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// List all clients, ordered by name (case-insensitive) then id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    /// Returns `StoreError::DataCorruption` if a stored client does not decode.
    pub async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let mut clients: Vec<Client> = list_entities(self.backend, Collection::Clients).await?;
        clients.sort_by_cached_key(|client| name_order(&client.name, client.id.as_str()));
        Ok(clients)
    }

    /// Get a client by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the client does not exist.
    pub async fn get_client(&self, id: &ClientId) -> Result<Client, StoreError> {
        get_entity(self.backend, Collection::Clients, id.as_str()).await
    }

    /// Create a client and point every listed contact back at it.
    ///
    /// A listed contact that is still owned by another client is moved: it is
    /// dropped from that client's list in the same batch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the input is invalid.
    /// Returns `StoreError::OperationFailed` if a listed contact does not
    /// exist; nothing is written in that case.
    #[instrument(skip(self, input), fields(client_id = tracing::field::Empty))]
    pub async fn create_client(&self, input: ClientInput) -> Result<Client, StoreError> {
        let new_client = input.validate()?;
        let id = ClientId::generate();
        tracing::Span::current().record("client_id", id.as_str());

        let (id, new_client) = (&id, &new_client);
        let client = commit_with_retry(
            self.backend,
            self.options,
            "create client",
            move || async move {
                let now = Utc::now();
                let client = build_client(id.clone(), new_client.clone(), now);

                let mut batch = WriteBatch::new();
                batch.create(Collection::Clients, id.as_str(), encode(&client)?);
                self.plan_attach(&mut batch, id, &client.contacts, now)
                    .await?;
                Ok::<_, StoreError>((batch, client))
            },
        )
        .await?;

        info!(contacts = client.contacts.len(), "Created client");
        Ok(client)
    }

    /// Update a client's fields and, when `contacts` is given, reconcile the
    /// back-references of added and removed contacts.
    ///
    /// Returns the client as stored after the commit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the update is invalid.
    /// Returns `StoreError::NotFound` if the client does not exist.
    /// Returns `StoreError::OperationFailed` if the batch is rejected, e.g.
    /// because an added contact does not exist.
    #[instrument(skip(self, update), fields(client_id = %id))]
    pub async fn update_client(
        &self,
        id: &ClientId,
        update: ClientUpdate,
    ) -> Result<Client, StoreError> {
        let changes = update.validate()?;
        let changes = &changes;

        let (added, removed) = commit_with_retry(
            self.backend,
            self.options,
            "update client",
            move || async move {
                let Some(current) = self.read(id).await? else {
                    return Err(StoreError::not_found(Collection::Clients, id.as_str()));
                };
                let now = Utc::now();
                let diff = changes
                    .contacts
                    .as_deref()
                    .map(|contacts| diff_references(&current.entity.contacts, contacts))
                    .unwrap_or_default();
                debug!(
                    added = diff.added.len(),
                    removed = diff.removed.len(),
                    version = current.version,
                    "Planned contact changes"
                );

                let mut batch = WriteBatch::new();
                self.plan_release(&mut batch, id, &diff.removed).await?;
                self.plan_attach(&mut batch, id, &diff.added, now).await?;

                let mut timestamp = current.entity.timestamp;
                timestamp.touch(now);
                let fields = client_field_changes(changes)?.set_serialized("timestamp", &timestamp)?;
                batch.update_if_version(Collection::Clients, id.as_str(), fields, current.version);

                Ok::<_, StoreError>((batch, (diff.added.len(), diff.removed.len())))
            },
        )
        .await?;

        info!(added, removed, "Updated client");
        self.get_client(id).await
    }

    /// Delete a client and clear `clientId` on every contact it owned.
    ///
    /// Contacts are detached, never deleted. Besides the client's own list,
    /// any contact still pointing at the client is released too.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the client does not exist.
    /// Returns `StoreError::OperationFailed` if the batch is rejected.
    #[instrument(skip(self), fields(client_id = %id))]
    pub async fn delete_client(&self, id: &ClientId) -> Result<(), StoreError> {
        let released = commit_with_retry(
            self.backend,
            self.options,
            "delete client",
            move || async move {
                let Some(current) = self.read(id).await? else {
                    return Err(StoreError::not_found(Collection::Clients, id.as_str()));
                };

                let mut owned = current.entity.contacts;
                let pointing = self
                    .backend
                    .query(Collection::Contacts, &Filter::eq("clientId", id.as_str()))
                    .await?;
                for doc in pointing {
                    let contact_id = ContactId::from(doc.id);
                    if !owned.contains(&contact_id) {
                        owned.push(contact_id);
                    }
                }

                let mut batch = WriteBatch::new();
                self.plan_release(&mut batch, id, &owned).await?;
                let released = batch.count_for(Collection::Contacts);
                batch.delete_if_version(Collection::Clients, id.as_str(), current.version);
                Ok::<_, StoreError>((batch, released))
            },
        )
        .await?;

        info!(released, "Deleted client");
        Ok(())
    }

    async fn read(&self, id: &ClientId) -> Result<Option<Versioned<Client>>, StoreError> {
        read_entity(self.backend, Collection::Clients, id.as_str()).await
    }

    async fn read_contact(&self, id: &ContactId) -> Result<Option<Versioned<Contact>>, StoreError> {
        read_entity(self.backend, Collection::Contacts, id.as_str()).await
    }

    /// Plan `clientId = client_id` on each added contact.
    async fn plan_attach(
        &self,
        batch: &mut WriteBatch,
        client_id: &ClientId,
        added: &[ContactId],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut moved: BTreeMap<ClientId, Vec<ContactId>> = BTreeMap::new();

        for contact_id in added {
            let assign = FieldChanges::new().set("clientId", client_id.as_str());
            let Some(contact) = self.read_contact(contact_id).await? else {
                // Unguarded update of a missing document: the commit fails
                // and nothing in the batch is applied.
                warn!(contact_id = %contact_id, "Referenced contact does not exist");
                batch.update(Collection::Contacts, contact_id.as_str(), assign);
                continue;
            };

            match &contact.entity.client_id {
                Some(owner) if owner == client_id => continue,
                Some(owner) => moved
                    .entry(owner.clone())
                    .or_default()
                    .push(contact_id.clone()),
                None => {}
            }
            batch.update_if_version(
                Collection::Contacts,
                contact_id.as_str(),
                assign,
                contact.version,
            );
        }

        for (owner, contact_ids) in moved {
            self.plan_drop_from_owner(batch, &owner, &contact_ids, now)
                .await?;
        }
        Ok(())
    }

    /// Plan clearing `clientId` on contacts still owned by `client_id`.
    async fn plan_release(
        &self,
        batch: &mut WriteBatch,
        client_id: &ClientId,
        removed: &[ContactId],
    ) -> Result<(), StoreError> {
        for contact_id in removed {
            match self.read_contact(contact_id).await? {
                Some(contact) if contact.entity.client_id.as_ref() == Some(client_id) => {
                    batch.update_if_version(
                        Collection::Contacts,
                        contact_id.as_str(),
                        FieldChanges::new().delete("clientId"),
                        contact.version,
                    );
                }
                Some(_) => {
                    debug!(contact_id = %contact_id, "Contact already points elsewhere, leaving it");
                }
                None => {
                    warn!(contact_id = %contact_id, "Removed contact no longer exists");
                }
            }
        }
        Ok(())
    }

    /// Plan removing moved contacts from the list of the client that had them.
    async fn plan_drop_from_owner(
        &self,
        batch: &mut WriteBatch,
        owner: &ClientId,
        contact_ids: &[ContactId],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let Some(previous) = self.read(owner).await? else {
            debug!(previous_owner = %owner, "Previous owner no longer exists");
            return Ok(());
        };

        let Versioned { entity, version } = previous;
        let remaining: Vec<ContactId> = entity
            .contacts
            .iter()
            .filter(|id| !contact_ids.contains(id))
            .cloned()
            .collect();
        if remaining.len() == entity.contacts.len() {
            return Ok(());
        }

        let mut timestamp = entity.timestamp;
        timestamp.touch(now);
        let fields = FieldChanges::new()
            .set_serialized("contacts", &remaining)?
            .set_serialized("timestamp", &timestamp)?;
        batch.update_if_version(Collection::Clients, owner.as_str(), fields, version);

        info!(previous_owner = %owner, moved = contact_ids.len(), "Moving contacts between clients");
        Ok(())
    }
}

fn build_client(id: ClientId, new_client: NewClient, now: DateTime<Utc>) -> Client {
    Client {
        id,
        name: new_client.name,
        email: new_client.email,
        phone: new_client.phone,
        address: new_client.address,
        client_type: new_client.client_type,
        contacts: new_client.contacts,
        timestamp: Timestamps::created(now),
    }
}

fn client_field_changes(changes: &ClientChanges) -> Result<FieldChanges, StoreError> {
    let fields = patch(FieldChanges::new(), "name", changes.name.as_ref())?;
    let fields = patch_clearable(fields, "email", changes.email.as_ref().map(Option::as_ref))?;
    let fields = patch_clearable(fields, "phone", changes.phone.as_ref().map(Option::as_ref))?;
    let fields = patch_clearable(
        fields,
        "address",
        changes.address.as_ref().map(Option::as_ref),
    )?;
    let fields = patch(fields, "clientType", changes.client_type.as_ref())?;
    patch(fields, "contacts", changes.contacts.as_ref())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use washline_core::ClientType;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::ContactInput;
    use crate::repositories::ContactRepository;

    async fn contact(store: &MemoryStore, name: &str) -> ContactId {
        ContactRepository::new(store, StoreOptions::default())
            .create_contact(ContactInput {
                name: name.to_string(),
                ..ContactInput::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn owner_of(store: &MemoryStore, id: &ContactId) -> Option<ClientId> {
        ContactRepository::new(store, StoreOptions::default())
            .get_contact(id)
            .await
            .unwrap()
            .client_id
    }

    async fn contact_version(store: &MemoryStore, id: &ContactId) -> i64 {
        store
            .get(Collection::Contacts, id.as_str())
            .await
            .unwrap()
            .unwrap()
            .version
    }

    fn input(name: &str, contacts: &[&ContactId]) -> ClientInput {
        ClientInput {
            name: name.to_string(),
            contacts: contacts.iter().map(|id| (*id).clone()).collect(),
            ..ClientInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_sets_back_references() {
        let store = MemoryStore::new();
        let (c1, c2) = (contact(&store, "Ana").await, contact(&store, "Ben").await);
        let repo = ClientRepository::new(&store, StoreOptions::default());

        let client = repo.create_client(input("Harbor Hotel", &[&c1, &c2])).await.unwrap();

        assert_eq!(client.contacts, vec![c1.clone(), c2.clone()]);
        assert_eq!(owner_of(&store, &c1).await, Some(client.id.clone()));
        assert_eq!(owner_of(&store, &c2).await, Some(client.id.clone()));
        assert_eq!(repo.get_client(&client.id).await.unwrap(), client);
    }

    #[tokio::test]
    async fn test_update_diffs_contact_list() {
        let store = MemoryStore::new();
        let c1 = contact(&store, "Ana").await;
        let c2 = contact(&store, "Ben").await;
        let c3 = contact(&store, "Cy").await;
        let repo = ClientRepository::new(&store, StoreOptions::default());
        let client = repo.create_client(input("Harbor Hotel", &[&c1, &c2])).await.unwrap();
        let c2_version = contact_version(&store, &c2).await;

        let updated = repo
            .update_client(&client.id, ClientUpdate::contacts([c2.clone(), c3.clone()]))
            .await
            .unwrap();

        assert_eq!(updated.contacts, vec![c2.clone(), c3.clone()]);
        assert_eq!(owner_of(&store, &c1).await, None);
        assert_eq!(owner_of(&store, &c2).await, Some(client.id.clone()));
        assert_eq!(owner_of(&store, &c3).await, Some(client.id.clone()));
        assert_eq!(contact_version(&store, &c2).await, c2_version);
        assert!(updated.timestamp.updated_at >= client.timestamp.updated_at);
        assert_eq!(updated.timestamp.created_at, client.timestamp.created_at);
    }

    #[tokio::test]
    async fn test_update_fields_only_leaves_contacts_alone() {
        let store = MemoryStore::new();
        let c1 = contact(&store, "Ana").await;
        let repo = ClientRepository::new(&store, StoreOptions::default());
        let client = repo.create_client(input("Harbor Hotel", &[&c1])).await.unwrap();
        let version = contact_version(&store, &c1).await;

        let update = ClientUpdate {
            name: Some("Harbour Hotel".to_string()),
            client_type: Some(ClientType::Hospitality),
            ..ClientUpdate::default()
        };
        let updated = repo.update_client(&client.id, update).await.unwrap();

        assert_eq!(updated.name, "Harbour Hotel");
        assert_eq!(updated.client_type, ClientType::Hospitality);
        assert_eq!(updated.contacts, vec![c1.clone()]);
        assert_eq!(contact_version(&store, &c1).await, version);
    }

    #[tokio::test]
    async fn test_missing_contact_aborts_create() {
        let store = MemoryStore::new();
        let c1 = contact(&store, "Ana").await;
        let ghost = ContactId::from("does-not-exist");
        let repo = ClientRepository::new(&store, StoreOptions::default());
        let commits = store.commit_count();

        let err = repo
            .create_client(input("Harbor Hotel", &[&c1, &ghost]))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::OperationFailed(_)));
        assert_eq!(store.commit_count(), commits);
        assert!(repo.list_clients().await.unwrap().is_empty());
        assert_eq!(owner_of(&store, &c1).await, None);
    }

    #[tokio::test]
    async fn test_missing_contact_aborts_update() {
        let store = MemoryStore::new();
        let c1 = contact(&store, "Ana").await;
        let repo = ClientRepository::new(&store, StoreOptions::default());
        let client = repo.create_client(input("Harbor Hotel", &[&c1])).await.unwrap();

        let err = repo
            .update_client(&client.id, ClientUpdate::contacts(["ghost"]))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::OperationFailed(_)));
        assert_eq!(repo.get_client(&client.id).await.unwrap(), client);
        assert_eq!(owner_of(&store, &c1).await, Some(client.id.clone()));
    }

    #[tokio::test]
    async fn test_moving_contact_drops_it_from_previous_owner() {
        let store = MemoryStore::new();
        let c1 = contact(&store, "Ana").await;
        let repo = ClientRepository::new(&store, StoreOptions::default());
        let first = repo.create_client(input("First", &[&c1])).await.unwrap();

        let second = repo.create_client(input("Second", &[&c1])).await.unwrap();

        assert_eq!(owner_of(&store, &c1).await, Some(second.id.clone()));
        assert!(repo.get_client(&first.id).await.unwrap().contacts.is_empty());
    }

    #[tokio::test]
    async fn test_delete_releases_contacts() {
        let store = MemoryStore::new();
        let (c1, c2) = (contact(&store, "Ana").await, contact(&store, "Ben").await);
        let repo = ClientRepository::new(&store, StoreOptions::default());
        let client = repo.create_client(input("Harbor Hotel", &[&c1, &c2])).await.unwrap();

        repo.delete_client(&client.id).await.unwrap();

        assert!(repo.get_client(&client.id).await.unwrap_err().is_not_found());
        assert_eq!(owner_of(&store, &c1).await, None);
        assert_eq!(owner_of(&store, &c2).await, None);
    }

    #[tokio::test]
    async fn test_missing_client_is_not_found() {
        let store = MemoryStore::new();
        let repo = ClientRepository::new(&store, StoreOptions::default());
        let missing = ClientId::from("nope");

        assert!(repo.get_client(&missing).await.unwrap_err().is_not_found());
        assert!(
            repo.update_client(&missing, ClientUpdate::default())
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(repo.delete_client(&missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let store = MemoryStore::new();
        let repo = ClientRepository::new(&store, StoreOptions::default());
        for name in ["bayside Laundry", "Alpine Spa", "Cedar Clinic"] {
            repo.create_client(input(name, &[])).await.unwrap();
        }

        let names: Vec<_> = repo
            .list_clients()
            .await
            .unwrap()
            .into_iter()
            .map(|client| client.name)
            .collect();
        assert_eq!(names, ["Alpine Spa", "bayside Laundry", "Cedar Clinic"]);
    }

    #[tokio::test]
    async fn test_offline_backend_is_unavailable() {
        let store = MemoryStore::new();
        let repo = ClientRepository::new(&store, StoreOptions::default());
        store.set_offline(true);

        assert!(matches!(
            repo.list_clients().await,
            Err(StoreError::StoreUnavailable(_))
        ));
    }
}
