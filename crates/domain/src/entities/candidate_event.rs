//! Candidate events declared by the story graph and the single-event selection rule.

use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::EventId;

/// Core events gate story progression; random events are flavor only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Core,
    #[default]
    Random,
}

impl EventKind {
    pub fn is_core(&self) -> bool {
        matches!(self, EventKind::Core)
    }

    /// Lower ranks win.
    fn rank(&self) -> u8 {
        match self {
            EventKind::Core => 0,
            EventKind::Random => 1,
        }
    }
}

/// What firing an event does to the world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEffects {
    /// Becomes every participant's current objective. Usually a string.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub character_changes: Value,
    /// Merged into the scene state's free-form changes.
    #[serde(default)]
    pub scene_changes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub id: EventId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: EventKind,
    /// Larger fires first among events of the same kind.
    #[serde(default)]
    pub priority: i32,
    /// Repeatable events may fire again after being recorded.
    #[serde(default)]
    pub repeatable: bool,
    /// Free text the Director reads to decide whether the event applies.
    #[serde(default)]
    pub trigger_conditions: String,
    #[serde(default)]
    pub description_template: String,
    #[serde(default)]
    pub effects: EventEffects,
}

impl CandidateEvent {
    pub fn new(id: impl Into<EventId>, kind: EventKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            priority: 0,
            repeatable: false,
            trigger_conditions: String::new(),
            description_template: String::new(),
            effects: EventEffects::default(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_trigger_conditions(mut self, conditions: impl Into<String>) -> Self {
        self.trigger_conditions = conditions.into();
        self
    }

    pub fn with_description(mut self, template: impl Into<String>) -> Self {
        self.description_template = template.into();
        self
    }

    pub fn with_effects(mut self, effects: EventEffects) -> Self {
        self.effects = effects;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Whether the event may still fire given what has already fired.
    pub fn is_available(&self, triggered: &[EventId]) -> bool {
        self.repeatable || !triggered.contains(&self.id)
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// An event together with its position in the location's declaration order.
#[derive(Debug, Clone, Copy)]
pub struct RankedEvent<'a> {
    pub declaration_index: usize,
    pub event: &'a CandidateEvent,
}

impl RankedEvent<'_> {
    fn key(&self) -> (u8, Reverse<i32>, usize, &str) {
        (
            self.event.kind.rank(),
            Reverse(self.event.priority),
            self.declaration_index,
            self.event.id.as_str(),
        )
    }
}

/// Total order over simultaneously eligible events; `Less` fires first.
///
/// Core beats random, then higher `priority`, then earlier declaration, then id.
pub fn compare_event_priority(a: &RankedEvent<'_>, b: &RankedEvent<'_>) -> Ordering {
    a.key().cmp(&b.key())
}

/// Pick the one event that fires this turn, if any.
///
/// Only one event may ever fire per turn, however many are eligible.
pub fn select_event<'a>(
    eligible: impl IntoIterator<Item = RankedEvent<'a>>,
) -> Option<&'a CandidateEvent> {
    eligible
        .into_iter()
        .min_by(compare_event_priority)
        .map(|ranked| ranked.event)
}
