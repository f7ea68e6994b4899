//! Staff user repository.

use chrono::Utc;
use tracing::{info, instrument, warn};

use washline_core::{Email, Timestamps, UserId};

use super::{
    StoreOptions, delete_entity, get_entity, insert_entity, list_entities, name_order, patch,
    patch_clearable, touched, update_entity,
};
use crate::db::{Collection, DocumentStore, FieldChanges};
use crate::error::{StoreError, ValidationErrors};
use crate::models::{User, UserInput, UserUpdate};

/// Repository for staff user documents.
pub struct UserRepository<'a> {
    backend: &'a dyn DocumentStore,
    options: StoreOptions,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn DocumentStore, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// List all staff users, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = list_entities(self.backend, Collection::Users).await?;
        users.sort_by_cached_key(|user| name_order(&user.name, user.id.as_str()));
        Ok(users)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user does not exist.
    pub async fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        get_entity(self.backend, Collection::Users, id.as_str()).await
    }

    /// Find a user by email, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the backend cannot be reached.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let users: Vec<User> = list_entities(self.backend, Collection::Users).await?;
        Ok(users
            .into_iter()
            .find(|user| user.email.matches(email)))
    }

    /// Create a staff user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the input is invalid or the
    /// email is already used by another user.
    #[instrument(skip(self, input), fields(user_id = tracing::field::Empty))]
    pub async fn create_user(&self, input: UserInput) -> Result<User, StoreError> {
        let new_user = input.validate()?;
        self.ensure_email_free(&new_user.email, None).await?;

        let user = User {
            id: UserId::generate(),
            name: new_user.name,
            email: new_user.email,
            phone: new_user.phone,
            role: new_user.role,
            active: new_user.active,
            timestamp: Timestamps::created(Utc::now()),
        };
        tracing::Span::current().record("user_id", user.id.as_str());

        insert_entity(self.backend, Collection::Users, user.id.as_str(), &user).await?;
        info!(role = %user.role, "Created user");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `StoreError::ValidationFailed` if the update is invalid.
    /// Returns `StoreError::NotFound` if the user does not exist.
    #[instrument(skip(self, update), fields(user_id = %id))]
    pub async fn update_user(&self, id: &UserId, update: UserUpdate) -> Result<User, StoreError> {
        let changes = update.validate()?;
        if let Some(email) = &changes.email {
            self.ensure_email_free(email, Some(id)).await?;
        }

        let fields = patch(FieldChanges::new(), "name", changes.name.as_ref())?;
        let fields = patch(fields, "email", changes.email.as_ref())?;
        let fields = patch_clearable(fields, "phone", changes.phone.as_ref().map(Option::as_ref))?;
        let fields = patch(fields, "role", changes.role.as_ref())?;
        let fields = patch(fields, "active", changes.active.as_ref())?;

        let user = update_entity(
            self.backend,
            self.options,
            Collection::Users,
            id.as_str(),
            |current: &User| touched(fields.clone(), current.timestamp),
        )
        .await?;

        info!("Updated user");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user does not exist.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: &UserId) -> Result<(), StoreError> {
        delete_entity(self.backend, Collection::Users, id.as_str()).await?;
        info!("Deleted user");
        Ok(())
    }

    async fn ensure_email_free(
        &self,
        email: &Email,
        except: Option<&UserId>,
    ) -> Result<(), StoreError> {
        match self.find_by_email(email).await? {
            Some(existing) if Some(&existing.id) != except => {
                warn!(existing_user = %existing.id, "Email already in use");
                let mut errors = ValidationErrors::new();
                errors.add("email", "is already used by another user");
                Err(errors.into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use washline_core::StaffRole;

    use super::*;
    use crate::db::MemoryStore;

    fn input(name: &str, email: &str) -> UserInput {
        UserInput {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            role: StaffRole::Staff,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(&store, StoreOptions::default());
        repo.create_user(input("Sam", "sam@washline.example")).await.unwrap();

        let err = repo
            .create_user(input("Samantha", "SAM@washline.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailed(ref e) if e.has("email")));
    }

    #[tokio::test]
    async fn test_update_own_email_allowed() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(&store, StoreOptions::default());
        let user = repo.create_user(input("Sam", "sam@washline.example")).await.unwrap();

        let update = UserUpdate {
            email: Some("sam@washline.example".to_string()),
            role: Some(StaffRole::Manager),
            ..UserUpdate::default()
        };
        let updated = repo.update_user(&user.id, update).await.unwrap();
        assert_eq!(updated.role, StaffRole::Manager);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(&store, StoreOptions::default());
        let zoe = repo.create_user(input("Zoe", "zoe@washline.example")).await.unwrap();
        repo.create_user(input("Ari", "ari@washline.example")).await.unwrap();

        let names: Vec<_> = repo
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.name)
            .collect();
        assert_eq!(names, ["Ari", "Zoe"]);

        repo.delete_user(&zoe.id).await.unwrap();
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }
}
