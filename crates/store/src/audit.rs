//! Read-only check of the client/contact reference invariant.
//!
//! A contact's `clientId` names client X exactly when X's `contacts` list
//! holds the contact. The audit reads both collections and reports every
//! place where one side disagrees with the other. The two collections are
//! read one after the other, so writes landing in between can show up as
//! transient issues.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{info, warn};

use washline_core::{ClientId, ContactId};

use crate::error::StoreError;
use crate::models::{Client, Contact};
use crate::store::EntityStore;

/// One broken reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceIssue {
    /// A client lists a contact id that does not exist.
    MissingContact {
        client_id: ClientId,
        contact_id: ContactId,
    },
    /// A client lists a contact whose `clientId` is absent or names another client.
    BackReferenceMismatch {
        client_id: ClientId,
        contact_id: ContactId,
        found: Option<ClientId>,
    },
    /// A contact points at a client that does not list it.
    Unlisted {
        contact_id: ContactId,
        client_id: ClientId,
    },
    /// A contact points at a client that does not exist.
    DanglingClient {
        contact_id: ContactId,
        client_id: ClientId,
    },
    /// More than one client lists the same contact.
    SharedContact {
        contact_id: ContactId,
        client_ids: Vec<ClientId>,
    },
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingContact {
                client_id,
                contact_id,
            } => write!(f, "client {client_id} lists missing contact {contact_id}"),
            Self::BackReferenceMismatch {
                client_id,
                contact_id,
                found: Some(other),
            } => write!(
                f,
                "client {client_id} lists contact {contact_id}, which points at client {other}"
            ),
            Self::BackReferenceMismatch {
                client_id,
                contact_id,
                found: None,
            } => write!(
                f,
                "client {client_id} lists contact {contact_id}, which has no clientId"
            ),
            Self::Unlisted {
                contact_id,
                client_id,
            } => write!(
                f,
                "contact {contact_id} points at client {client_id}, which does not list it"
            ),
            Self::DanglingClient {
                contact_id,
                client_id,
            } => write!(
                f,
                "contact {contact_id} points at missing client {client_id}"
            ),
            Self::SharedContact {
                contact_id,
                client_ids,
            } => {
                let ids: Vec<&str> = client_ids.iter().map(ClientId::as_str).collect();
                write!(f, "contact {contact_id} is listed by clients {}", ids.join(", "))
            }
        }
    }
}

/// Result of an audit run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub clients_checked: usize,
    pub contacts_checked: usize,
    pub issues: Vec<ReferenceIssue>,
}

impl AuditReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Audit every client and contact.
///
/// # Errors
///
/// Returns `StoreError` if either collection cannot be read.
pub async fn audit_references(store: &EntityStore) -> Result<AuditReport, StoreError> {
    let clients = store.clients().list_clients().await?;
    let contacts = store.contacts().list_contacts().await?;

    let report = check_references(&clients, &contacts);
    if report.is_consistent() {
        info!(
            clients = report.clients_checked,
            contacts = report.contacts_checked,
            "Reference audit passed"
        );
    } else {
        warn!(issues = report.issues.len(), "Reference audit found issues");
    }
    Ok(report)
}

/// Compare both sides of the relationship.
#[must_use]
pub fn check_references(clients: &[Client], contacts: &[Contact]) -> AuditReport {
    let contacts_by_id: HashMap<&ContactId, &Contact> =
        contacts.iter().map(|contact| (&contact.id, contact)).collect();
    let clients_by_id: HashMap<&ClientId, &Client> =
        clients.iter().map(|client| (&client.id, client)).collect();

    let mut issues = Vec::new();
    let mut listed_by: BTreeMap<&ContactId, Vec<ClientId>> = BTreeMap::new();

    for client in clients {
        for contact_id in &client.contacts {
            listed_by
                .entry(contact_id)
                .or_default()
                .push(client.id.clone());

            match contacts_by_id.get(contact_id) {
                None => issues.push(ReferenceIssue::MissingContact {
                    client_id: client.id.clone(),
                    contact_id: contact_id.clone(),
                }),
                Some(contact) if contact.client_id.as_ref() != Some(&client.id) => {
                    issues.push(ReferenceIssue::BackReferenceMismatch {
                        client_id: client.id.clone(),
                        contact_id: contact_id.clone(),
                        found: contact.client_id.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    for contact in contacts {
        let Some(client_id) = &contact.client_id else {
            continue;
        };
        match clients_by_id.get(client_id) {
            None => issues.push(ReferenceIssue::DanglingClient {
                contact_id: contact.id.clone(),
                client_id: client_id.clone(),
            }),
            Some(client) if !client.contacts.contains(&contact.id) => {
                issues.push(ReferenceIssue::Unlisted {
                    contact_id: contact.id.clone(),
                    client_id: client_id.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for (contact_id, client_ids) in listed_by {
        if client_ids.len() > 1 {
            issues.push(ReferenceIssue::SharedContact {
                contact_id: contact_id.clone(),
                client_ids,
            });
        }
    }

    AuditReport {
        clients_checked: clients.len(),
        contacts_checked: contacts.len(),
        issues,
    }
}
