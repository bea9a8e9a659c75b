//! Type-safe identifier wrappers.
//!
//! Roster data (units, bases, countries) arrives with human-authored string
//! identifiers such as `"usaf_f35_1"` or `"USA"`, so every identifier is a
//! transparent `String` newtype rather than a UUID. Keeping them distinct
//! types prevents passing a base id where a unit id is expected.
//!
//! Operation ids are generated app-side as `op_` followed by eight hex
//! characters taken from a random UUID v4.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a transparent newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id! {
    /// Identifier of a military unit within a country's roster.
    UnitId
}

define_id! {
    /// Identifier of a military base.
    BaseId
}

define_id! {
    /// Identifier of an active or historical operation (`op_xxxxxxxx`).
    OperationId
}

define_id! {
    /// Identifier of an active event instance (`<event_type>_<year>_<month>`).
    EventId
}

define_id! {
    /// Identifier of a sector or infrastructure project.
    ProjectId
}

define_id! {
    /// ISO-style country code. Always stored upper-case.
    CountryCode
}

impl OperationId {
    /// Generate a fresh operation id of the form `op_` + 8 hex characters.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        let short: String = hex.chars().take(8).collect();
        Self(format!("op_{short}"))
    }
}

impl CountryCode {
    /// Build a country code, normalising it to upper case.
    pub fn normalized(value: &str) -> Self {
        Self(value.trim().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_operation_ids_have_prefix_and_length() {
        let id = OperationId::generate();
        assert!(id.as_str().starts_with("op_"));
        assert_eq!(id.as_str().len(), 11);
        assert!(id.as_str().chars().skip(3).all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_operation_ids_differ() {
        assert_ne!(OperationId::generate(), OperationId::generate());
    }

    #[test]
    fn country_code_is_upper_cased() {
        assert_eq!(CountryCode::normalized(" usa ").as_str(), "USA");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&UnitId::from("f35_wing_1"));
        assert_eq!(json.ok().as_deref(), Some("\"f35_wing_1\""));
    }
}
