//! Entry point tying a backend to the repositories.

use std::sync::Arc;

use tracing::info;

use crate::config::{BackendConfig, StoreConfig};
use crate::db::{DocumentStore, MemoryStore, PgDocumentStore, create_pool};
use crate::error::StoreError;
use crate::repositories::{
    ClientRepository, ContactRepository, ItemRepository, JobRepository, ServiceRepository,
    StoreOptions, UserRepository,
};

/// The relationship-consistent entity store.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn DocumentStore>,
    options: StoreOptions,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("backend", &self.backend.backend_name())
            .field("options", &self.options)
            .finish()
    }
}

impl EntityStore {
    /// Wrap a backend with default options.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    #[must_use]
    pub fn with_options(backend: Arc<dyn DocumentStore>, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// A store over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Build the configured backend and check that it is reachable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the database cannot be reached.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend: Arc<dyn DocumentStore> = match &config.backend {
            BackendConfig::Postgres(pg) => {
                let pool = create_pool(&pg.database_url, pg.max_connections, pg.acquire_timeout)
                    .await
                    .map_err(|e| StoreError::StoreUnavailable(e.to_string()))?;
                Arc::new(PgDocumentStore::new(pool))
            }
            BackendConfig::Memory => Arc::new(MemoryStore::new()),
        };
        backend.ping().await?;

        info!(
            backend = backend.backend_name(),
            conflict_retries = config.conflict_retries,
            "Entity store connected"
        );
        Ok(Self::with_options(backend, config.options()))
    }

    #[must_use]
    pub fn backend(&self) -> &dyn DocumentStore {
        self.backend.as_ref()
    }

    #[must_use]
    pub const fn options(&self) -> StoreOptions {
        self.options
    }

    #[must_use]
    pub fn clients(&self) -> ClientRepository<'_> {
        ClientRepository::new(self.backend.as_ref(), self.options)
    }

    #[must_use]
    pub fn contacts(&self) -> ContactRepository<'_> {
        ContactRepository::new(self.backend.as_ref(), self.options)
    }

    #[must_use]
    pub fn jobs(&self) -> JobRepository<'_> {
        JobRepository::new(self.backend.as_ref(), self.options)
    }

    #[must_use]
    pub fn items(&self) -> ItemRepository<'_> {
        ItemRepository::new(self.backend.as_ref(), self.options)
    }

    #[must_use]
    pub fn services(&self) -> ServiceRepository<'_> {
        ServiceRepository::new(self.backend.as_ref(), self.options)
    }

    #[must_use]
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.backend.as_ref(), self.options)
    }
}
