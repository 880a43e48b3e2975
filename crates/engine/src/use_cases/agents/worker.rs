//! Character worker: one Oracle call turning an instruction into a reaction.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use storyloom_domain::{CharacterRecord, ConversationRecord};

use super::prompt;
use crate::infrastructure::ports::{ChatMessage, EscalationError, LlmPort, LlmRequest};
use crate::use_cases::oracle_text::parse_record;

const WORKER_TEMPERATURE: f32 = 0.8;

/// Everything a character is told about the turn. Shared by all workers.
#[derive(Debug, Clone)]
pub struct SceneBriefing {
    pub instruction: String,
    /// Visible description of the current location.
    pub scene_text: String,
    pub location_name: String,
    /// Rendered game time (`Day 1 12:00`).
    pub time: String,
    /// Recent turns, oldest first.
    pub history: Vec<ConversationRecord>,
    pub player_role: Option<String>,
}

/// A parsed worker reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkerReaction {
    #[serde(default)]
    pub dialogue: String,
    #[serde(default, alias = "action")]
    pub action_intent: String,
    #[serde(default, alias = "inner_thoughts")]
    pub inner_monologue: String,
    #[serde(default)]
    pub perceived_state: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Reacted(WorkerReaction),
    /// Oracle call or parsing failed; the character sits this turn out.
    Degraded { reason: String },
}

impl WorkerOutcome {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn dialogue(&self) -> String {
        match self {
            Self::Reacted(reaction) => reaction.dialogue.clone(),
            Self::Degraded { reason } => format!("processing failed: {reason}"),
        }
    }

    pub fn action_intent(&self) -> &str {
        match self {
            Self::Reacted(reaction) => &reaction.action_intent,
            Self::Degraded { .. } => "",
        }
    }

    pub fn reaction(&self) -> Option<&WorkerReaction> {
        match self {
            Self::Reacted(reaction) => Some(reaction),
            Self::Degraded { .. } => None,
        }
    }
}

pub struct CharacterWorker {
    llm: Arc<dyn LlmPort>,
}

impl CharacterWorker {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    /// Ask the Oracle how `character` reacts.
    ///
    /// Oracle and parse failures degrade. Only an escalation is returned as an
    /// error, since it has to abort the whole turn.
    pub async fn react(
        &self,
        character: &CharacterRecord,
        briefing: &SceneBriefing,
    ) -> Result<WorkerOutcome, EscalationError> {
        let request = LlmRequest::new(vec![ChatMessage::user(prompt::user_prompt(briefing))])
            .with_system_prompt(prompt::system_prompt(character, briefing))
            .with_temperature(WORKER_TEMPERATURE)
            .expecting_json();

        let response = match self.llm.generate(request).await {
            Ok(response) => response,
            Err(e) => {
                if let Some(escalation) = e.escalation() {
                    return Err(escalation.clone());
                }
                tracing::warn!(character = %character.id, error = %e, "Character worker degraded");
                return Ok(WorkerOutcome::degraded(e.to_string()));
            }
        };

        match parse_record::<WorkerReaction>(&response.content) {
            Ok(reaction) => {
                tracing::debug!(
                    character = %character.id,
                    action = %reaction.action_intent,
                    "Character reacted"
                );
                Ok(WorkerOutcome::Reacted(reaction))
            }
            Err(e) => {
                tracing::warn!(
                    character = %character.id,
                    error = %e,
                    "Character worker returned unusable output"
                );
                Ok(WorkerOutcome::degraded(e.to_string()))
            }
        }
    }
}
