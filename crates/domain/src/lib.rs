//! Storyloom domain: story graph, save snapshot records and turn invariants.
//!
//! Pure types only. Persistence, the text oracle and HTTP live in
//! `storyloom-engine`.

pub mod common;
pub mod entities;
pub mod error;
pub mod game_time;
pub mod ids;
pub mod save_step;
pub mod value_objects;

pub use entities::{
    compare_event_priority, select_event, CandidateEvent, CandidateMonster, CharacterRecord,
    CharacterState, Connection, EventEffects, EventKind, PrerequisiteContext, RankedEvent, Room,
    Scene, StoryGraph, TransitionKind, TransitionPrerequisite,
};
pub use error::DomainError;
pub use game_time::{GameTime, TimeOfDay};
pub use ids::{CharacterId, EventId, MonsterId, RoomId, SceneId, ThemeId};
pub use save_step::SaveStep;
pub use value_objects::{
    AgentExecutionResult, ConversationHistory, ConversationRecord, DecisionPoint,
    DirectorDecision, Location, SceneState, DEFAULT_ELAPSED_MINUTES,
};
