//! Job repository.

use chrono::Utc;
use tracing::{info, instrument};

use washline_core::{Actor, ClientId, JobId, Timestamps};

use super::{
    StoreOptions, clear_on_empty, decode_all, delete_entity, get_entity, insert_entity,
    list_entities, patch, patch_clearable, touched, update_entity,
};
use crate::db::{Collection, DocumentStore, FieldChanges, Filter};
use crate::error::StoreError;
use crate::models::{Job, JobInput, JobUpdate};

/// Repository for job documents.
pub struct JobRepository<'a> {
    backend: &'a dyn DocumentStore,
    options: StoreOptions,
}

impl<'a> JobRepository<'a> {
    /// Create a new job repository.
    #[must_use]
    pub const fn new(backend: &'a dyn DocumentStore, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// List all jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(newest_first(list_entities(self.backend, Collection::Jobs).await?))
    }

    /// Jobs recorded against one client, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn list_jobs_for_client(&self, client_id: &ClientId) -> Result<Vec<Job>, StoreError> {
        let docs = self
            .backend
            .query(Collection::Jobs, &Filter::eq("clientId", client_id.as_str()))
            .await?;
        Ok(newest_first(decode_all(Collection::Jobs, docs)?))
    }

    /// Get a job by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the job does not exist.
    pub async fn get_job(&self, id: &JobId) -> Result<Job, StoreError> {
        get_entity(self.backend, Collection::Jobs, id.as_str()).await
    }

    /// Create a job on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the input is invalid.
    #[instrument(skip(self, actor, input), fields(job_id = tracing::field::Empty, user_id = %actor.user_id))]
    pub async fn create_job(&self, actor: &Actor, input: JobInput) -> Result<Job, StoreError> {
        let input = input.validate()?;
        let job = Job {
            id: JobId::generate(),
            client_id: input.client_id,
            title: input.title,
            status: input.status,
            item_ids: input.item_ids,
            service_ids: input.service_ids,
            pickup_date: input.pickup_date,
            due_date: input.due_date,
            notes: input.notes,
            created_by: actor.user_id.clone(),
            timestamp: Timestamps::created(Utc::now()),
        };
        tracing::Span::current().record("job_id", job.id.as_str());

        insert_entity(self.backend, Collection::Jobs, job.id.as_str(), &job).await?;

        info!(client_id = %job.client_id, "Created job");
        Ok(job)
    }

    /// Update a job.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the job does not exist.
    /// Returns `StoreError::ValidationFailed` if the update is invalid.
    #[instrument(skip(self, update), fields(job_id = %id))]
    pub async fn update_job(&self, id: &JobId, update: JobUpdate) -> Result<Job, StoreError> {
        let job = update_entity(
            self.backend,
            self.options,
            Collection::Jobs,
            id.as_str(),
            |current: &Job| {
                // Date checks depend on the stored job, so validate per attempt.
                let update = update.clone().validate(current)?;
                let fields = patch(FieldChanges::new(), "clientId", update.client_id.as_ref())?;
                let fields = patch(fields, "title", update.title.as_ref())?;
                let fields = patch(fields, "status", update.status.as_ref())?;
                let fields = patch(fields, "itemIds", update.item_ids.as_ref())?;
                let fields = patch(fields, "serviceIds", update.service_ids.as_ref())?;
                let fields = patch(fields, "pickupDate", update.pickup_date.as_ref())?;
                let fields = patch(fields, "dueDate", update.due_date.as_ref())?;
                let fields =
                    patch_clearable(fields, "notes", clear_on_empty(update.notes.as_ref()))?;
                touched(fields, current.timestamp)
            },
        )
        .await?;

        info!(status = ?job.status, "Updated job");
        Ok(job)
    }

    /// Delete a job.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the job does not exist.
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn delete_job(&self, id: &JobId) -> Result<(), StoreError> {
        delete_entity(self.backend, Collection::Jobs, id.as_str()).await?;
        info!("Deleted job");
        Ok(())
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| {
        b.timestamp
            .created_at
            .cmp(&a.timestamp.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    jobs
}
