use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::MonsterId;

/// A monster a location may introduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMonster {
    pub id: MonsterId,
    pub name: String,
    #[serde(default)]
    pub stats: Map<String, Value>,
    #[serde(default)]
    pub appearance_conditions: String,
    #[serde(default)]
    pub battle_description_template: String,
}

impl CandidateMonster {
    pub fn new(id: impl Into<MonsterId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stats: Map::new(),
            appearance_conditions: String::new(),
            battle_description_template: String::new(),
        }
    }

    pub fn with_appearance_conditions(mut self, conditions: impl Into<String>) -> Self {
        self.appearance_conditions = conditions.into();
        self
    }

    pub fn with_stat(mut self, key: impl Into<String>, value: Value) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    /// Generated decisions name monsters by id or by display name.
    pub fn matches_reference(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.id.as_str() == reference || self.name.eq_ignore_ascii_case(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_by_id_or_case_insensitive_name() {
        let wraith = CandidateMonster::new("monster_007", "Vault Wraith");
        assert!(wraith.matches_reference("monster_007"));
        assert!(wraith.matches_reference(" vault wraith "));
        assert!(!wraith.matches_reference("wraith"));
    }
}
