use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Opaque region identifier.
    RegionId
);

string_id!(
    /// Player identity as handed over by the calling system.
    PlayerId
);

string_id!(
    /// Name of a permission group. Grants and region defaults reference
    /// groups by name only; the creator is recovered through
    /// [`GroupStore::resolve_by_name`](crate::GroupStore::resolve_by_name).
    GroupName
);

impl PlayerId {
    /// A well-formed identity is non-empty and contains no whitespace or
    /// control characters.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(|c| c.is_whitespace() || c.is_control())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_player_ids() {
        assert!(PlayerId::from("alice").is_well_formed());
        assert!(PlayerId::from("7c9e6679-7425-40de-944b-e07fc1f90ae7").is_well_formed());
        assert!(!PlayerId::from("").is_well_formed());
        assert!(!PlayerId::from("bob smith").is_well_formed());
        assert!(!PlayerId::from("eve\u{0}").is_well_formed());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = RegionId::from("spawn");
        assert_eq!(ron::to_string(&id).unwrap(), "\"spawn\"");
    }
}
