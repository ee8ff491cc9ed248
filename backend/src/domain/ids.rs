//! UUID-backed identifiers for epics, habits and habit commits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_identifier! {
    /// Stable identifier of an epic.
    EpicId
}

uuid_identifier! {
    /// Stable identifier of a habit.
    HabitId
}

uuid_identifier! {
    /// Stable identifier of a recorded habit completion.
    HabitCommitId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_serialise_as_bare_uuid_strings() {
        let uuid = Uuid::nil();
        let encoded = serde_json::to_string(&EpicId::from_uuid(uuid)).expect("serialises");
        assert_eq!(encoded, format!("\"{uuid}\""));
    }

    #[test]
    fn parsing_rejects_garbage() {
        assert!("epic-1".parse::<HabitId>().is_err());
    }
}
