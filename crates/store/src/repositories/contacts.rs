//! Contact repository.
//!
//! Contacts are plain CRUD except for their `clientId` back-reference, which
//! only client operations write. Deleting a contact pulls it out of every
//! client list that still names it, in the same batch.

use chrono::Utc;
use tracing::{info, instrument, warn};

use washline_core::{ClientId, ContactId, Timestamps};

use super::{
    StoreOptions, Versioned, commit_with_retry, decode, decode_all, decode_versioned, get_entity,
    insert_entity, list_entities, name_order, patch, patch_clearable, read_entity, touched,
    update_entity,
};
use crate::db::{Collection, DocumentStore, FieldChanges, Filter, WriteBatch};
use crate::error::StoreError;
use crate::models::{Client, Contact, ContactChanges, ContactInput, ContactUpdate};

/// Repository for contact documents.
pub struct ContactRepository<'a> {
    backend: &'a dyn DocumentStore,
    options: StoreOptions,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(backend: &'a dyn DocumentStore, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// List all contacts, ordered by name (case-insensitive) then id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn list_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        Ok(sorted(list_entities(self.backend, Collection::Contacts).await?))
    }

    /// Contacts not owned by any client, for the client form's picker.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn list_unassigned_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        let docs = self
            .backend
            .query(Collection::Contacts, &Filter::is_null("clientId"))
            .await?;
        Ok(sorted(decode_all(Collection::Contacts, docs)?))
    }

    /// The contacts a client lists, in list order.
    ///
    /// Ids that no longer resolve are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the client does not exist.
    pub async fn list_client_contacts(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Contact>, StoreError> {
        let client: Client = get_entity(self.backend, Collection::Clients, client_id.as_str()).await?;

        let ids: Vec<String> = client.contacts.iter().map(|id| id.to_string()).collect();
        let docs = self.backend.get_many(Collection::Contacts, &ids).await?;

        let mut contacts = Vec::with_capacity(docs.len());
        for (id, doc) in ids.iter().zip(docs) {
            match doc {
                Some(doc) => contacts.push(decode(Collection::Contacts, doc)?),
                None => warn!(client_id = %client_id, contact_id = %id, "Listed contact does not exist"),
            }
        }
        Ok(contacts)
    }

    /// Get a contact by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the contact does not exist.
    pub async fn get_contact(&self, id: &ContactId) -> Result<Contact, StoreError> {
        get_entity(self.backend, Collection::Contacts, id.as_str()).await
    }

    /// Create an unassigned contact.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the input is invalid.
    #[instrument(skip(self, input), fields(contact_id = tracing::field::Empty))]
    pub async fn create_contact(&self, input: ContactInput) -> Result<Contact, StoreError> {
        let new_contact = input.validate()?;
        let contact = Contact {
            id: ContactId::generate(),
            name: new_contact.name,
            email: new_contact.email,
            phone: new_contact.phone,
            address: new_contact.address,
            contact_type: new_contact.contact_type,
            client_id: None,
            timestamp: Timestamps::created(Utc::now()),
        };
        tracing::Span::current().record("contact_id", contact.id.as_str());

        insert_entity(self.backend, Collection::Contacts, contact.id.as_str(), &contact).await?;

        info!("Created contact");
        Ok(contact)
    }

    /// Update a contact's own fields. `clientId` is never touched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the update is invalid.
    /// Returns `StoreError::NotFound` if the contact does not exist.
    #[instrument(skip(self, update), fields(contact_id = %id))]
    pub async fn update_contact(
        &self,
        id: &ContactId,
        update: ContactUpdate,
    ) -> Result<Contact, StoreError> {
        let changes = update.validate()?;
        let contact = update_entity(
            self.backend,
            self.options,
            Collection::Contacts,
            id.as_str(),
            |current: &Contact| touched(contact_field_changes(&changes)?, current.timestamp),
        )
        .await?;

        info!("Updated contact");
        Ok(contact)
    }

    /// Delete a contact, removing it from every client that lists it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the contact does not exist.
    /// Returns `StoreError::OperationFailed` if the batch is rejected.
    #[instrument(skip(self), fields(contact_id = %id))]
    pub async fn delete_contact(&self, id: &ContactId) -> Result<(), StoreError> {
        let detached = commit_with_retry(
            self.backend,
            self.options,
            "delete contact",
            move || async move {
                let Some(current) = self.read(id).await? else {
                    return Err(StoreError::not_found(Collection::Contacts, id.as_str()));
                };

                let mut owners = self
                    .backend
                    .query(Collection::Clients, &Filter::array_contains("contacts", id.as_str()))
                    .await?;
                if let Some(owner) = &current.entity.client_id
                    && !owners.iter().any(|doc| doc.id == owner.as_str())
                    && let Some(doc) = self.backend.get(Collection::Clients, owner.as_str()).await?
                {
                    owners.push(doc);
                }

                let now = Utc::now();
                let mut batch = WriteBatch::new();
                for doc in owners {
                    let Versioned { entity, version } =
                        decode_versioned::<Client>(Collection::Clients, doc)?;
                    let remaining: Vec<&ContactId> =
                        entity.contacts.iter().filter(|c| *c != id).collect();
                    if remaining.len() == entity.contacts.len() {
                        continue;
                    }

                    let mut timestamp = entity.timestamp;
                    timestamp.touch(now);
                    let fields = FieldChanges::new()
                        .set_serialized("contacts", &remaining)?
                        .set_serialized("timestamp", &timestamp)?;
                    batch.update_if_version(Collection::Clients, entity.id.as_str(), fields, version);
                }

                let detached = batch.count_for(Collection::Clients);
                batch.delete_if_version(Collection::Contacts, id.as_str(), current.version);
                Ok::<_, StoreError>((batch, detached))
            },
        )
        .await?;

        info!(detached, "Deleted contact");
        Ok(())
    }

    async fn read(&self, id: &ContactId) -> Result<Option<Versioned<Contact>>, StoreError> {
        read_entity(self.backend, Collection::Contacts, id.as_str()).await
    }
}

fn sorted(mut contacts: Vec<Contact>) -> Vec<Contact> {
    contacts.sort_by_cached_key(|contact| name_order(&contact.name, contact.id.as_str()));
    contacts
}

fn contact_field_changes(changes: &ContactChanges) -> Result<FieldChanges, StoreError> {
    let fields = patch(FieldChanges::new(), "name", changes.name.as_ref())?;
    let fields = patch_clearable(fields, "email", changes.email.as_ref().map(Option::as_ref))?;
    let fields = patch_clearable(fields, "phone", changes.phone.as_ref().map(Option::as_ref))?;
    let fields = patch_clearable(
        fields,
        "address",
        changes.address.as_ref().map(Option::as_ref),
    )?;
    patch(fields, "contactType", changes.contact_type.as_ref())
}
