//! Priced service repository.

use chrono::Utc;
use tracing::{info, instrument};

use washline_core::{Actor, ServiceId, Timestamps};

use super::{
    StoreOptions, clear_on_empty, delete_entity, get_entity, insert_entity, list_entities,
    name_order, patch, patch_clearable, touched, update_entity,
};
use crate::db::{Collection, DocumentStore, FieldChanges};
use crate::error::StoreError;
use crate::models::{Service, ServiceInput, ServiceUpdate};

/// Repository for service documents.
pub struct ServiceRepository<'a> {
    backend: &'a dyn DocumentStore,
    options: StoreOptions,
}

impl<'a> ServiceRepository<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn DocumentStore, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// List all services, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        let mut services: Vec<Service> = list_entities(self.backend, Collection::Services).await?;
        services.sort_by_cached_key(|service| name_order(&service.name, service.id.as_str()));
        Ok(services)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the service does not exist.
    pub async fn get_service(&self, id: &ServiceId) -> Result<Service, StoreError> {
        get_entity(self.backend, Collection::Services, id.as_str()).await
    }

    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the input is invalid, e.g. a
    /// negative price.
    #[instrument(skip(self, actor, input), fields(service_id = tracing::field::Empty))]
    pub async fn create_service(
        &self,
        actor: &Actor,
        input: ServiceInput,
    ) -> Result<Service, StoreError> {
        let input = input.validate()?;
        let service = Service {
            id: ServiceId::generate(),
            name: input.name,
            description: input.description,
            price: input.price,
            unit: input.unit,
            active: input.active,
            created_by: actor.user_id.clone(),
            timestamp: Timestamps::created(Utc::now()),
        };
        tracing::Span::current().record("service_id", service.id.as_str());

        insert_entity(self.backend, Collection::Services, service.id.as_str(), &service).await?;
        info!(price = %service.price, "Created service");
        Ok(service)
    }

    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the update is invalid.
    /// Returns `StoreError::NotFound` if the service does not exist.
    #[instrument(skip(self, update), fields(service_id = %id))]
    pub async fn update_service(
        &self,
        id: &ServiceId,
        update: ServiceUpdate,
    ) -> Result<Service, StoreError> {
        let update = update.validate()?;

        let fields = patch(FieldChanges::new(), "name", update.name.as_ref())?;
        let fields = patch_clearable(
            fields,
            "description",
            clear_on_empty(update.description.as_ref()),
        )?;
        let fields = patch(fields, "price", update.price.as_ref())?;
        let fields = patch(fields, "unit", update.unit.as_ref())?;
        let fields = patch(fields, "active", update.active.as_ref())?;

        let service = update_entity(
            self.backend,
            self.options,
            Collection::Services,
            id.as_str(),
            |current: &Service| touched(fields.clone(), current.timestamp),
        )
        .await?;

        info!("Updated service");
        Ok(service)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the service does not exist.
    #[instrument(skip(self), fields(service_id = %id))]
    pub async fn delete_service(&self, id: &ServiceId) -> Result<(), StoreError> {
        delete_entity(self.backend, Collection::Services, id.as_str()).await?;
        info!("Deleted service");
        Ok(())
    }
}
