//! Item catalogue repository.

use chrono::Utc;
use tracing::{info, instrument};

use washline_core::{Actor, ItemId, Timestamps};

use super::{
    StoreOptions, clear_on_empty, delete_entity, get_entity, insert_entity, list_entities,
    name_order, patch, patch_clearable, touched, update_entity,
};
use crate::db::{Collection, DocumentStore, FieldChanges};
use crate::error::StoreError;
use crate::models::{Item, ItemInput, ItemUpdate};

/// Repository for item documents.
pub struct ItemRepository<'a> {
    backend: &'a dyn DocumentStore,
    options: StoreOptions,
}

impl<'a> ItemRepository<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn DocumentStore, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// List all items, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let mut items: Vec<Item> = list_entities(self.backend, Collection::Items).await?;
        items.sort_by_cached_key(|item| name_order(&item.name, item.id.as_str()));
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the item does not exist.
    pub async fn get_item(&self, id: &ItemId) -> Result<Item, StoreError> {
        get_entity(self.backend, Collection::Items, id.as_str()).await
    }

    /// Add an item to the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the input is invalid.
    #[instrument(skip(self, actor, input), fields(item_id = tracing::field::Empty))]
    pub async fn create_item(&self, actor: &Actor, input: ItemInput) -> Result<Item, StoreError> {
        let input = input.validate()?;
        let item = Item {
            id: ItemId::generate(),
            name: input.name,
            description: input.description,
            category: input.category,
            quantity: input.quantity,
            created_by: actor.user_id.clone(),
            timestamp: Timestamps::created(Utc::now()),
        };
        tracing::Span::current().record("item_id", item.id.as_str());

        insert_entity(self.backend, Collection::Items, item.id.as_str(), &item).await?;
        info!("Created item");
        Ok(item)
    }

    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the update is invalid.
    /// Returns `StoreError::NotFound` if the item does not exist.
    #[instrument(skip(self, update), fields(item_id = %id))]
    pub async fn update_item(&self, id: &ItemId, update: ItemUpdate) -> Result<Item, StoreError> {
        let update = update.validate()?;

        let fields = patch(FieldChanges::new(), "name", update.name.as_ref())?;
        let fields = patch_clearable(
            fields,
            "description",
            clear_on_empty(update.description.as_ref()),
        )?;
        let fields = patch_clearable(fields, "category", clear_on_empty(update.category.as_ref()))?;
        let fields = patch(fields, "quantity", update.quantity.as_ref())?;

        let item = update_entity(
            self.backend,
            self.options,
            Collection::Items,
            id.as_str(),
            |current: &Item| touched(fields.clone(), current.timestamp),
        )
        .await?;

        info!("Updated item");
        Ok(item)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the item does not exist.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn delete_item(&self, id: &ItemId) -> Result<(), StoreError> {
        delete_entity(self.backend, Collection::Items, id.as_str()).await?;
        info!("Deleted item");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use washline_core::UserId;

    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_crud() {
        let store = MemoryStore::new();
        let repo = ItemRepository::new(&store, StoreOptions::default());
        let actor = Actor::new(UserId::from("u1"));

        let shirt = repo
            .create_item(&actor, ItemInput::named("shirt"))
            .await
            .unwrap();
        let duvet = repo
            .create_item(
                &actor,
                ItemInput {
                    category: Some("bedding".to_string()),
                    ..ItemInput::named("Duvet")
                },
            )
            .await
            .unwrap();

        let names: Vec<_> = repo
            .list_items()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, ["Duvet", "shirt"]);

        let update = ItemUpdate {
            category: Some(String::new()),
            quantity: Some(2),
            ..ItemUpdate::default()
        };
        let updated = repo.update_item(&duvet.id, update).await.unwrap();
        assert!(updated.category.is_none());
        assert_eq!(updated.quantity, 2);

        repo.delete_item(&shirt.id).await.unwrap();
        assert!(repo.get_item(&shirt.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_blank_name_never_reaches_storage() {
        let store = MemoryStore::new();
        let repo = ItemRepository::new(&store, StoreOptions::default());

        let err = repo
            .create_item(&Actor::new(UserId::from("u1")), ItemInput::named("  "))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::ValidationFailed(_)));
        assert_eq!(store.commit_count(), 0);
    }
}
