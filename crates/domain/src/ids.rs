use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifiers in a story graph are authored strings (`scene_001`, `room_001_001`),
/// so every ID wraps a `String` rather than a generated UUID.
macro_rules! define_id {
    ($name:ident) => {
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

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Partition of all content and save lines
define_id!(ThemeId);

// Story graph locations
define_id!(SceneId);
define_id!(RoomId);

// Participants
define_id!(CharacterId);

// Candidates
define_id!(EventId);
define_id!(MonsterId);
