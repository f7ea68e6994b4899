//! Newtype IDs for type-safe document references.
//!
//! Documents are addressed by opaque string ids allocated by the store. Use the
//! `define_id!` macro to create type-safe ID wrappers that prevent accidentally
//! mixing ids from different collections.

/// Macro to define a type-safe document ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `generate()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use washline_core::define_id;
/// define_id!(ClientId);
/// define_id!(ContactId);
///
/// let client_id = ClientId::new("c-1");
/// let contact_id = ContactId::generate();
///
/// assert_eq!(client_id.as_str(), "c-1");
/// assert!(!contact_id.is_blank());
///
/// // These are different types, so this won't compile:
/// // let _: ClientId = contact_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing document id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Allocate a fresh, collision-resistant document id.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4().simple().to_string())
            }

            /// Get the underlying id string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the id string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the id is empty or whitespace only.
            ///
            /// Blank ids never address a document.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard document IDs
define_id!(ClientId);
define_id!(ContactId);
define_id!(JobId);
define_id!(ItemId);
define_id!(ServiceId);
define_id!(UserId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ClientId::generate();
        let b = ClientId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_blank_detection() {
        assert!(ContactId::new("").is_blank());
        assert!(ContactId::new("   ").is_blank());
        assert!(!ContactId::new("abc").is_blank());
    }

    #[test]
    fn test_serde_transparent() {
        let id = ContactId::new("contact-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"contact-1\"");

        let parsed: ContactId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_display() {
        let id = JobId::from("job-9");
        assert_eq!(format!("{id}"), "job-9");
    }
}
