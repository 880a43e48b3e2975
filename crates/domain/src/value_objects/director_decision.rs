use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::TransitionKind;
use crate::{CharacterId, EventId, MonsterId};

/// Minutes a turn takes when the Director gives no usable estimate.
pub const DEFAULT_ELAPSED_MINUTES: f64 = 1.0;

fn default_elapsed_minutes() -> f64 {
    DEFAULT_ELAPSED_MINUTES
}

/// Adjudicated outcome of one character's intended action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    pub character_id: CharacterId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub actual_outcome: String,
    /// Deep-merged into the character's attributes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attribute_changes: Map<String, Value>,
}

/// A choice the Director offers the player, shown verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    pub has_decision: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Default for DecisionPoint {
    fn default() -> Self {
        Self {
            has_decision: false,
            description: "no decision".to_string(),
            options: Vec::new(),
        }
    }
}

/// One turn's arbitration result. Transient: only its effects are persisted.
///
/// As parsed from the Director, `trigger_event_id`, `competing_event_ids`,
/// `appear_monsters` and `transition_target` are proposals. After graph
/// validation at most one event remains and `competing_event_ids` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorDecision {
    #[serde(default)]
    pub agent_execution_results: Vec<AgentExecutionResult>,
    #[serde(default)]
    pub updated_narrative: String,
    #[serde(default)]
    pub scene_state_changes: Map<String, Value>,
    #[serde(default)]
    pub trigger_event_id: Option<EventId>,
    /// Further events the Director considered firing in the same turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub competing_event_ids: Vec<EventId>,
    #[serde(default)]
    pub event_narration: String,
    #[serde(default)]
    pub appear_monsters: Vec<MonsterId>,
    #[serde(default)]
    pub monster_narration: String,
    #[serde(default)]
    pub transition_target: Option<String>,
    #[serde(default)]
    pub transition_kind: Option<TransitionKind>,
    #[serde(default = "default_elapsed_minutes")]
    pub elapsed_minutes: f64,
    #[serde(default)]
    pub reasoning: String,
    /// Why a proposed transition or event was refused, if one was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
    #[serde(default)]
    pub decision_point: DecisionPoint,
}

impl DirectorDecision {
    /// No event, no monsters, no transition, default elapsed time.
    pub fn neutral(elapsed_minutes: f64) -> Self {
        Self {
            agent_execution_results: Vec::new(),
            updated_narrative: String::new(),
            scene_state_changes: Map::new(),
            trigger_event_id: None,
            competing_event_ids: Vec::new(),
            event_narration: String::new(),
            appear_monsters: Vec::new(),
            monster_narration: String::new(),
            transition_target: None,
            transition_kind: None,
            elapsed_minutes,
            reasoning: String::new(),
            blocking_reason: None,
            decision_point: DecisionPoint::default(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn result_for(&self, character_id: &CharacterId) -> Option<&AgentExecutionResult> {
        self.agent_execution_results
            .iter()
            .find(|result| &result.character_id == character_id)
    }

    pub fn any_action_succeeded(&self) -> bool {
        self.agent_execution_results.iter().any(|result| result.success)
    }

    /// Every event the Director proposed, primary first, without duplicates.
    pub fn proposed_events(&self) -> Vec<EventId> {
        let mut proposed: Vec<EventId> = Vec::new();
        for id in self.trigger_event_id.iter().chain(&self.competing_event_ids) {
            if !proposed.contains(id) {
                proposed.push(id.clone());
            }
        }
        proposed
    }

    pub fn has_effects(&self) -> bool {
        self.trigger_event_id.is_some()
            || !self.appear_monsters.is_empty()
            || self.transition_target.is_some()
    }
}

impl Default for DirectorDecision {
    fn default() -> Self {
        Self::neutral(DEFAULT_ELAPSED_MINUTES)
    }
}
