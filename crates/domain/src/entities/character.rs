//! Character record - one participant's persistent sheet inside a save snapshot
//!
//! A record is owned by the snapshot it lives in. The engine reads it at the
//! start of a turn, folds the turn's deltas into a copy, and writes that copy
//! into the next snapshot only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::deep_merge;
use crate::{CharacterId, ThemeId};

/// Two-tier character state.
///
/// `surface` is what other participants can perceive (posture, location,
/// combat state). `hidden` holds inner monologue and concealed notes that only
/// the engine and the Director see.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    #[serde(default)]
    pub surface: Map<String, Value>,
    #[serde(default)]
    pub hidden: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Theme this character is tagged with in the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeId>,
    /// Vitals, equipment and anything else the story tracks.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub state: CharacterState,
}

impl CharacterRecord {
    pub fn new(id: impl Into<CharacterId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            theme: None,
            attributes: Map::new(),
            state: CharacterState::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_theme(mut self, theme: impl Into<ThemeId>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn belongs_to(&self, theme: &ThemeId) -> bool {
        self.theme.as_ref() == Some(theme)
    }

    /// Name shown to players, falling back to the id for unnamed records.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    pub fn set_surface(&mut self, key: impl Into<String>, value: Value) {
        self.state.surface.insert(key.into(), value);
    }

    pub fn set_hidden(&mut self, key: impl Into<String>, value: Value) {
        self.state.hidden.insert(key.into(), value);
    }

    pub fn surface(&self, key: &str) -> Option<&Value> {
        self.state.surface.get(key)
    }

    /// Merge adjudicated attribute changes (e.g. `{"vitals": {"hp": 7}}`).
    ///
    /// Nested objects merge key by key so a change to one vital does not wipe
    /// the others.
    pub fn merge_attributes(&mut self, changes: &Map<String, Value>) {
        for (key, change) in changes {
            match self.attributes.get_mut(key) {
                Some(existing) => deep_merge(existing, change),
                None => {
                    self.attributes.insert(key.clone(), change.clone());
                }
            }
        }
    }
}
