//! Identity of the signed-in user performing an operation.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// The authenticated caller, as supplied by the identity provider.
///
/// The store trusts this value; it only copies `user_id` into `createdBy`
/// audit fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

impl Actor {
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
        }
    }

    /// Attach the caller's email for log context.
    #[must_use]
    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }
}
