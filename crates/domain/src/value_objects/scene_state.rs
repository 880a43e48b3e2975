//! Scene state machine
//!
//! A save line is always `AtScene` or `AtRoom`. The only way between the two
//! is a transition the engine has already checked against the story graph.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::game_time::GameTime;
use crate::{EventId, RoomId, SceneId};

/// Where the party currently is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    AtScene { scene: SceneId },
    AtRoom { scene: SceneId, room: RoomId },
}

impl Location {
    pub fn scene_id(&self) -> &SceneId {
        match self {
            Location::AtScene { scene } | Location::AtRoom { scene, .. } => scene,
        }
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Location::AtScene { .. } => None,
            Location::AtRoom { room, .. } => Some(room),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::AtScene { scene } => write!(f, "{scene}"),
            Location::AtRoom { scene, room } => write!(f, "{scene}/{room}"),
        }
    }
}

/// Persisted scene record of one snapshot (`SCENE_STATE.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub current_scene_id: SceneId,
    #[serde(default)]
    pub current_room_id: Option<RoomId>,
    /// Every event ever fired on this save line, in firing order, no duplicates.
    #[serde(default)]
    pub triggered_event_ids: Vec<EventId>,
    #[serde(default)]
    pub state_changes: Map<String, Value>,
    /// Elapsed game seconds when the current location was entered.
    #[serde(default)]
    pub enter_time: u64,
}

impl SceneState {
    pub fn new(location: Location, now: &GameTime) -> Self {
        let (current_scene_id, current_room_id) = split(location);
        Self {
            current_scene_id,
            current_room_id,
            triggered_event_ids: Vec::new(),
            state_changes: Map::new(),
            enter_time: now.elapsed_seconds,
        }
    }

    pub fn location(&self) -> Location {
        match &self.current_room_id {
            Some(room) => Location::AtRoom {
                scene: self.current_scene_id.clone(),
                room: room.clone(),
            },
            None => Location::AtScene {
                scene: self.current_scene_id.clone(),
            },
        }
    }

    /// Enter `location`, restarting the time-spent-here clock.
    pub fn enter(&mut self, location: Location, now: &GameTime) {
        let (scene, room) = split(location);
        self.current_scene_id = scene;
        self.current_room_id = room;
        self.enter_time = now.elapsed_seconds;
    }

    /// Record a fired event. Returns `false` when it was already recorded.
    pub fn record_event(&mut self, event_id: EventId) -> bool {
        if self.has_fired(&event_id) {
            return false;
        }
        self.triggered_event_ids.push(event_id);
        true
    }

    pub fn has_fired(&self, event_id: &EventId) -> bool {
        self.triggered_event_ids.contains(event_id)
    }

    pub fn minutes_in_location(&self, now: &GameTime) -> f64 {
        now.seconds_since(self.enter_time) as f64 / 60.0
    }

    /// Shallow merge of free-form changes into `state_changes`.
    pub fn merge_changes(&mut self, changes: &Map<String, Value>) {
        for (key, value) in changes {
            self.state_changes.insert(key.clone(), value.clone());
        }
    }
}

fn split(location: Location) -> (SceneId, Option<RoomId>) {
    match location {
        Location::AtScene { scene } => (scene, None),
        Location::AtRoom { scene, room } => (scene, Some(room)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lobby() -> Location {
        Location::AtScene {
            scene: SceneId::new("scene_001"),
        }
    }

    #[test]
    fn entering_resets_enter_time() {
        let start = GameTime::start();
        let mut state = SceneState::new(lobby(), &start);
        let later = start.advance_minutes(30.0);
        assert_eq!(state.minutes_in_location(&later), 30.0);

        state.enter(
            Location::AtRoom {
                scene: SceneId::new("scene_001"),
                room: RoomId::new("room_001_001"),
            },
            &later,
        );
        assert_eq!(state.enter_time, later.elapsed_seconds);
        assert_eq!(state.minutes_in_location(&later), 0.0);
        assert_eq!(state.current_room_id, Some(RoomId::new("room_001_001")));
    }

    #[test]
    fn entering_a_scene_clears_the_room() {
        let start = GameTime::start();
        let mut state = SceneState::new(
            Location::AtRoom {
                scene: SceneId::new("scene_001"),
                room: RoomId::new("room_001_001"),
            },
            &start,
        );
        state.enter(
            Location::AtScene {
                scene: SceneId::new("scene_002"),
            },
            &start,
        );
        assert!(state.current_room_id.is_none());
        assert_eq!(state.location().scene_id().as_str(), "scene_002");
    }

    #[test]
    fn recording_an_event_is_idempotent() {
        let mut state = SceneState::new(lobby(), &GameTime::start());
        assert!(state.record_event(EventId::new("alarm")));
        assert!(!state.record_event(EventId::new("alarm")));
        assert_eq!(state.triggered_event_ids, vec![EventId::new("alarm")]);
    }

    #[test]
    fn persisted_record_without_room_reads_as_scene() {
        let state: SceneState = serde_json::from_value(json!({
            "current_scene_id": "scene_001",
            "current_room_id": null,
            "triggered_event_ids": [],
            "state_changes": {},
            "enter_time": 0
        }))
        .unwrap();
        assert_eq!(state.location(), lobby());
    }
}
