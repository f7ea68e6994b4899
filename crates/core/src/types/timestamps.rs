//! Creation/update timestamp pair carried by every document.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The `timestamp` field of a document.
///
/// Serialised as ISO-8601 strings under `createdAt` / `updatedAt`.
/// `created_at` is set once; only [`Timestamps::touch`] moves `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Both fields set to `now`.
    #[must_use]
    pub const fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// `updated_at` rendered the way it is stored.
    #[must_use]
    pub fn updated_at_iso(&self) -> String {
        self.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_touch_keeps_created_at() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut ts = Timestamps::created(start);
        ts.touch(start + Duration::minutes(5));

        assert_eq!(ts.created_at, start);
        assert_eq!(ts.updated_at, start + Duration::minutes(5));
    }

    #[test]
    fn test_touch_never_goes_backwards() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut ts = Timestamps::created(start);
        ts.touch(start - Duration::seconds(1));
        assert_eq!(ts.updated_at, start);
    }

    #[test]
    fn test_serialized_iso_strings() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let json = serde_json::to_value(Timestamps::created(start)).unwrap();
        assert_eq!(json["createdAt"], "2026-03-01T09:00:00Z");
        assert_eq!(json["updatedAt"], "2026-03-01T09:00:00Z");
    }
}
