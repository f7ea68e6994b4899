//! Laundry job domain types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use washline_core::{ClientId, ItemId, JobId, JobStatus, ServiceId, Timestamps, UserId};

use super::{clearable_text, optional_text, required_text};
use crate::error::ValidationErrors;

/// A unit of work for a client.
///
/// `client_id` is a plain foreign key; it is not checked against the clients
/// collection and is left dangling if the client is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub client_id: ClientId,
    pub title: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
    #[serde(default)]
    pub service_ids: Vec<ServiceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_by: UserId,
    pub timestamp: Timestamps,
}

/// Input for creating a job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobInput {
    pub client_id: ClientId,
    pub title: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
    #[serde(default)]
    pub service_ids: Vec<ServiceId>,
    #[serde(default)]
    pub pickup_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of a job; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobUpdate {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub item_ids: Option<Vec<ItemId>>,
    #[serde(default)]
    pub service_ids: Option<Vec<ServiceId>>,
    #[serde(default)]
    pub pickup_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Empty string clears the notes.
    #[serde(default)]
    pub notes: Option<String>,
}

fn check_dates(errors: &mut ValidationErrors, pickup: Option<NaiveDate>, due: Option<NaiveDate>) {
    if let (Some(pickup), Some(due)) = (pickup, due)
        && due < pickup
    {
        errors.add("dueDate", "must not be before the pickup date");
    }
}

fn without_blank<T: AsRef<str>>(ids: Vec<T>) -> Vec<T> {
    ids.into_iter()
        .filter(|id| !id.as_ref().trim().is_empty())
        .collect()
}

impl JobInput {
    /// Validate and normalise the input.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.client_id.is_blank() {
            errors.add("clientId", "is required");
        }
        let title = required_text(&mut errors, "title", &self.title);
        check_dates(&mut errors, self.pickup_date, self.due_date);

        errors.into_result(Self {
            title,
            item_ids: without_blank(self.item_ids),
            service_ids: without_blank(self.service_ids),
            notes: optional_text(self.notes),
            ..self
        })
    }
}

impl JobUpdate {
    /// Validate the update against the job it applies to.
    ///
    /// Date ordering is checked on the merged result, so moving only the
    /// pickup date past the stored due date is rejected.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self, current: &Job) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.client_id.as_ref().is_some_and(ClientId::is_blank) {
            errors.add("clientId", "cannot be blank");
        }
        let title = self
            .title
            .map(|title| required_text(&mut errors, "title", &title));
        check_dates(
            &mut errors,
            self.pickup_date.or(current.pickup_date),
            self.due_date.or(current.due_date),
        );

        errors.into_result(Self {
            title,
            item_ids: self.item_ids.map(without_blank),
            service_ids: self.service_ids.map(without_blank),
            notes: clearable_text(self.notes).map(|notes| notes.unwrap_or_default()),
            ..self
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> JobInput {
        JobInput {
            client_id: ClientId::from("c1"),
            title: "Weekly linen".to_string(),
            status: JobStatus::Pending,
            item_ids: vec![ItemId::from("i1"), ItemId::from(" ")],
            service_ids: Vec::new(),
            pickup_date: NaiveDate::from_ymd_opt(2026, 3, 2),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 4),
            notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let job = input().validate().unwrap();
        assert_eq!(job.item_ids, vec![ItemId::from("i1")]);
        assert!(job.notes.is_none());
    }

    #[test]
    fn test_due_before_pickup_rejected() {
        let job = JobInput {
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..input()
        };
        assert!(job.validate().unwrap_err().has("dueDate"));
    }

    #[test]
    fn test_blank_client_rejected() {
        let job = JobInput {
            client_id: ClientId::from(""),
            ..input()
        };
        assert!(job.validate().unwrap_err().has("clientId"));
    }
}
