//! Value objects - per-turn and per-snapshot records

mod director_decision;
mod history;
mod scene_state;

pub use director_decision::{
    AgentExecutionResult, DecisionPoint, DirectorDecision, DEFAULT_ELAPSED_MINUTES,
};
pub use history::{ConversationHistory, ConversationRecord};
pub use scene_state::{Location, SceneState};
