//! Director: one Oracle call per turn that adjudicates every character's
//! attempted action and proposes the turn's event, monsters and transition.
//!
//! Nothing the Director returns is trusted as-is. [`validate_decision`]
//! checks every proposal against the story graph before the coordinator
//! applies it.

mod parser;
mod prompt;
mod validate;

use std::sync::Arc;

use storyloom_domain::{CharacterRecord, DirectorDecision, GameTime, SceneState, StoryGraph};

use crate::infrastructure::ports::{ChatMessage, EscalationError, LlmPort, LlmRequest};
use crate::use_cases::agents::{SceneBriefing, WorkerOutcome};

pub use parser::parse_decision;
pub use validate::{validate_decision, Ruling, ValidationContext};

const DIRECTOR_TEMPERATURE: f32 = 0.3;

/// One participant's reaction as the Director sees it.
#[derive(Debug, Clone, Copy)]
pub struct ActorReport<'a> {
    pub character: &'a CharacterRecord,
    pub outcome: &'a WorkerOutcome,
}

/// Full turn context handed to the Director.
#[derive(Debug, Clone, Copy)]
pub struct DirectorBrief<'a> {
    pub graph: &'a StoryGraph,
    pub scene_state: &'a SceneState,
    pub game_time: &'a GameTime,
    pub briefing: &'a SceneBriefing,
    pub actors: &'a [ActorReport<'a>],
}

pub struct Director {
    llm: Arc<dyn LlmPort>,
    default_elapsed_minutes: f64,
}

impl Director {
    pub fn new(llm: Arc<dyn LlmPort>, default_elapsed_minutes: f64) -> Self {
        Self {
            llm,
            default_elapsed_minutes,
        }
    }

    /// Ask for the turn's decision.
    ///
    /// A failed call or an unusable reply yields a neutral decision. Only an
    /// escalation is returned as an error.
    pub async fn decide(&self, brief: &DirectorBrief<'_>) -> Result<DirectorDecision, EscalationError> {
        let request = LlmRequest::new(vec![ChatMessage::user(prompt::user_prompt(brief))])
            .with_system_prompt(prompt::system_prompt(brief))
            .with_temperature(DIRECTOR_TEMPERATURE)
            .expecting_json();

        let response = match self.llm.generate(request).await {
            Ok(response) => response,
            Err(e) => {
                if let Some(escalation) = e.escalation() {
                    return Err(escalation.clone());
                }
                tracing::warn!(error = %e, "Director call failed, using a neutral decision");
                return Ok(self.neutral(format!("director unavailable: {e}")));
            }
        };
        if response.truncated {
            tracing::warn!("Director reply hit the length limit");
        }

        match parse_decision(&response.content, self.default_elapsed_minutes) {
            Ok(decision) => {
                tracing::debug!(
                    event = ?decision.trigger_event_id.as_ref().map(|e| e.to_string()),
                    monsters = decision.appear_monsters.len(),
                    transition = ?decision.transition_target,
                    elapsed_minutes = decision.elapsed_minutes,
                    "Director decided"
                );
                Ok(decision)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Director reply unusable, using a neutral decision");
                Ok(self.neutral(format!("director reply unusable: {e}")))
            }
        }
    }

    fn neutral(&self, reasoning: String) -> DirectorDecision {
        DirectorDecision::neutral(self.default_elapsed_minutes).with_reasoning(reasoning)
    }
}
