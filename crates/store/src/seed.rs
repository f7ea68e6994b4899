//! Demo and fixture data loading.
//!
//! A seed file lists services, contacts and clients. Contacts carry a local
//! `key` that clients use to reference them, since document ids are only
//! allocated on create:
//!
//! ```yaml
//! contacts:
//!   - key: ana
//!     name: Ana Ruiz
//! clients:
//!   - name: Harbor Hotel
//!     clientType: hospitality
//!     contacts: [ana]
//! ```

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use washline_core::{Actor, ClientType, ContactId, ContactType};

use crate::error::StoreError;
use crate::models::{Address, ClientInput, ContactInput, ServiceInput};
use crate::store::EntityStore;

/// Errors raised while loading a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("contact key `{0}` is used more than once")]
    DuplicateKey(String),

    #[error("client `{client}` references unknown contact key `{key}`")]
    UnknownContactKey { client: String, key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parsed seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub services: Vec<ServiceInput>,
    #[serde(default)]
    pub contacts: Vec<SeedContact>,
    #[serde(default)]
    pub clients: Vec<SeedClient>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedContact {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub contact_type: ContactType,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedClient {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub client_type: ClientType,
    /// Contact keys, resolved to ids at load time.
    #[serde(default)]
    pub contacts: Vec<String>,
}

/// Counts of created documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub services: usize,
    pub contacts: usize,
    pub clients: usize,
}

impl SeedFile {
    /// Parse a YAML seed file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` if the YAML does not match the seed shape.
    pub fn from_yaml(yaml: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Check contact keys before anything is written.
    fn check_keys(&self) -> Result<(), SeedError> {
        let mut keys = HashSet::new();
        for contact in &self.contacts {
            if !keys.insert(contact.key.as_str()) {
                return Err(SeedError::DuplicateKey(contact.key.clone()));
            }
        }
        for client in &self.clients {
            if let Some(key) = client.contacts.iter().find(|key| !keys.contains(key.as_str())) {
                return Err(SeedError::UnknownContactKey {
                    client: client.name.clone(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Create every service, then every contact, then every client.
///
/// Not transactional across entities: a failure part way leaves the
/// documents created so far in place.
///
/// # Errors
///
/// Returns `SeedError` for bad contact keys (before any write) or the first
/// store error.
#[instrument(skip(store, actor, file), fields(user_id = %actor.user_id))]
pub async fn load_seed(
    store: &EntityStore,
    actor: &Actor,
    file: SeedFile,
) -> Result<SeedSummary, SeedError> {
    file.check_keys()?;
    let mut summary = SeedSummary::default();

    for service in file.services {
        store.services().create_service(actor, service).await?;
        summary.services += 1;
    }

    let mut ids: HashMap<String, ContactId> = HashMap::new();
    for seed in file.contacts {
        let contact = store
            .contacts()
            .create_contact(ContactInput {
                name: seed.name,
                email: seed.email,
                phone: seed.phone,
                address: seed.address,
                contact_type: seed.contact_type,
            })
            .await?;
        ids.insert(seed.key, contact.id);
        summary.contacts += 1;
    }

    for seed in file.clients {
        let contacts = seed
            .contacts
            .iter()
            .filter_map(|key| ids.get(key).cloned())
            .collect();
        store
            .clients()
            .create_client(ClientInput {
                name: seed.name,
                email: seed.email,
                phone: seed.phone,
                address: seed.address,
                client_type: seed.client_type,
                contacts,
            })
            .await?;
        summary.clients += 1;
    }

    info!(
        services = summary.services,
        contacts = summary.contacts,
        clients = summary.clients,
        "Seed data loaded"
    );
    Ok(summary)
}
