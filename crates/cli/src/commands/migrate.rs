//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! wl-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `WASHLINE_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Embedded from `crates/store/migrations/`.

use thiserror::Error;
use washline_store::config::{BackendConfig, StoreConfig};
use washline_store::db::{PgDocumentStore, create_pool};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migrations need the postgres backend, but WASHLINE_BACKEND is `{0}`")]
    NotPostgres(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the document table migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the backend is not postgres, the database is
/// unreachable, or a migration fails.
pub async fn run(config: &StoreConfig) -> Result<(), MigrationError> {
    let BackendConfig::Postgres(pg) = &config.backend else {
        return Err(MigrationError::NotPostgres(config.backend.name()));
    };

    tracing::info!("Connecting to database...");
    let pool = create_pool(&pg.database_url, pg.max_connections, pg.acquire_timeout).await?;

    tracing::info!("Running migrations...");
    PgDocumentStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
