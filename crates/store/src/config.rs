//! Store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (postgres backend)
//! - `WASHLINE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `WASHLINE_BACKEND` - `postgres` or `memory` (default: postgres)
//! - `WASHLINE_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `WASHLINE_DB_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 10)
//! - `WASHLINE_CONFLICT_RETRIES` - Re-runs after a concurrent modification (default: 3, max: 100)
//! - `WASHLINE_LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::repositories::{DEFAULT_CONFLICT_RETRIES, StoreOptions};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const MAX_CONFLICT_RETRIES: u32 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which document store to run against.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// `PostgreSQL` `JSONB` document table.
    Postgres(PostgresConfig),
    /// In-process store; data is lost on exit.
    Memory,
}

impl BackendConfig {
    /// Backend name as spelled in `WASHLINE_BACKEND`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// `PostgreSQL` connection settings.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct PostgresConfig {
    /// Connection URL (contains password)
    pub database_url: SecretString,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Log output format for binaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Entity store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub conflict_retries: u32,
    pub log_format: LogFormat,
}

impl StoreConfig {
    /// In-memory configuration with default tunables.
    #[must_use]
    pub const fn memory() -> Self {
        Self {
            backend: BackendConfig::Memory,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            log_format: LogFormat::Pretty,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let backend = match env.or_default("WASHLINE_BACKEND", "postgres").as_str() {
            "postgres" => BackendConfig::Postgres(PostgresConfig {
                database_url: env.database_url("WASHLINE_DATABASE_URL")?,
                max_connections: env
                    .parsed("WASHLINE_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
                acquire_timeout: Duration::from_secs(
                    env.parsed("WASHLINE_DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_ACQUIRE_TIMEOUT_SECS)?,
                ),
            }),
            "memory" => BackendConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "WASHLINE_BACKEND".to_string(),
                    format!("expected `postgres` or `memory`, got `{other}`"),
                ));
            }
        };

        let conflict_retries = env.parsed("WASHLINE_CONFLICT_RETRIES", DEFAULT_CONFLICT_RETRIES)?;
        if conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(ConfigError::InvalidEnvVar(
                "WASHLINE_CONFLICT_RETRIES".to_string(),
                format!("at most {MAX_CONFLICT_RETRIES}, got {conflict_retries}"),
            ));
        }

        Ok(Self {
            backend,
            conflict_retries,
            log_format: env.parsed("WASHLINE_LOG_FORMAT", LogFormat::default())?,
        })
    }

    /// Repository tunables derived from this configuration.
    #[must_use]
    pub const fn options(&self) -> StoreOptions {
        StoreOptions {
            conflict_retries: self.conflict_retries,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}
