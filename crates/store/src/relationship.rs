//! Client → contact reference bookkeeping.
//!
//! A client owns an ordered list of contact ids and each owned contact points
//! back with `clientId`. The helpers here decide which back-references a
//! client write must set or clear; the repositories turn that into batch
//! operations.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};

use washline_core::ContactId;

/// Drop blank ids and repeated ids, keeping the first occurrence in order.
#[must_use]
pub fn normalize_references<I>(ids: I) -> Vec<ContactId>
where
    I: IntoIterator<Item = ContactId>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| !id.is_blank())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Contacts to attach to and detach from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceDiff {
    /// In the new list but not the old one; `clientId` must be set.
    pub added: Vec<ContactId>,
    /// In the old list but not the new one; `clientId` must be cleared.
    pub removed: Vec<ContactId>,
}

impl ReferenceDiff {
    /// Both sides empty: no contact needs a write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Set difference between the stored and the requested contact lists.
///
/// Identity is id equality. Blank ids on either side are ignored, so they
/// never produce a write.
#[must_use]
pub fn diff_references(old: &[ContactId], new: &[ContactId]) -> ReferenceDiff {
    let old = normalize_references(old.iter().cloned());
    let new = normalize_references(new.iter().cloned());

    let old_set: HashSet<&ContactId> = old.iter().collect();
    let new_set: HashSet<&ContactId> = new.iter().collect();

    ReferenceDiff {
        added: new
            .iter()
            .filter(|id| !old_set.contains(id))
            .cloned()
            .collect(),
        removed: old
            .iter()
            .filter(|id| !new_set.contains(id))
            .cloned()
            .collect(),
    }
}

/// Deserialize a contact id list that may contain `null` or `""` entries.
///
/// Forms submit unselected picker slots as `null` or empty strings; they are
/// dropped here and never reach the diff. A `null` list is an empty one.
///
/// # Errors
///
/// Returns the deserializer's error if the value is neither `null` nor an
/// array of strings or nulls.
pub fn deserialize_reference_list<'de, D>(deserializer: D) -> Result<Vec<ContactId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(normalize_references(
        raw.into_iter().flatten().flatten().map(ContactId::from),
    ))
}

/// Like [`deserialize_reference_list`] for an optional field of an update.
///
/// # Errors
///
/// Returns the deserializer's error if the value is neither `null` nor a list.
pub fn deserialize_optional_reference_list<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<ContactId>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|ids| normalize_references(ids.into_iter().flatten().map(ContactId::from))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ContactId> {
        raw.iter().map(|s| ContactId::from(*s)).collect()
    }

    #[test]
    fn test_normalize_drops_blank_and_duplicates() {
        let normalized = normalize_references(ids(&["c1", "", "c2", "  ", "c1", "c3"]));
        assert_eq!(normalized, ids(&["c1", "c2", "c3"]));
    }

    #[test]
    fn test_diff_added_and_removed() {
        let diff = diff_references(&ids(&["c1", "c2"]), &ids(&["c2", "c3"]));
        assert_eq!(diff.added, ids(&["c3"]));
        assert_eq!(diff.removed, ids(&["c1"]));
    }

    #[test]
    fn test_diff_same_list_is_empty() {
        let diff = diff_references(&ids(&["c1", "c2"]), &ids(&["c2", "c1"]));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_ignores_blank_entries() {
        let diff = diff_references(&ids(&["c1", ""]), &ids(&["", "c1", "   "]));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_from_empty() {
        let diff = diff_references(&[], &ids(&["c1", "c2"]));
        assert_eq!(diff.added, ids(&["c1", "c2"]));
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_deserialize_drops_null_and_empty() {
        #[derive(Deserialize)]
        struct Form {
            #[serde(deserialize_with = "deserialize_reference_list")]
            contacts: Vec<ContactId>,
        }

        let form: Form =
            serde_json::from_str(r#"{"contacts": ["c1", null, "", "c2", "c1"]}"#).unwrap();
        assert_eq!(form.contacts, ids(&["c1", "c2"]));

        let form: Form = serde_json::from_str(r#"{"contacts": null}"#).unwrap();
        assert!(form.contacts.is_empty());
    }

    #[test]
    fn test_deserialize_optional_list() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "deserialize_optional_reference_list")]
            contacts: Option<Vec<ContactId>>,
        }

        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert!(absent.contacts.is_none());

        let cleared: Patch = serde_json::from_str(r#"{"contacts": [null]}"#).unwrap();
        assert_eq!(cleared.contacts, Some(Vec::new()));
    }
}
