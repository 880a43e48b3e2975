//! Entities read from authored content or owned by a save snapshot.

mod candidate_event;
mod character;
mod monster;
mod story_graph;

pub use candidate_event::{
    compare_event_priority, select_event, CandidateEvent, EventEffects, EventKind, RankedEvent,
};
pub use character::{CharacterRecord, CharacterState};
pub use monster::CandidateMonster;
pub use story_graph::{
    Connection, PrerequisiteContext, Room, Scene, StoryGraph, TransitionKind,
    TransitionPrerequisite,
};
