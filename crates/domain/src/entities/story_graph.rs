//! Story graph - the read-only, pre-parsed map of a theme
//!
//! Scenes contain rooms. Both declare candidate events, candidate monsters and
//! directed connections. The graph is authored content: the engine never
//! mutates it, it only checks Director proposals against it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::entities::{CandidateEvent, CandidateMonster, EventKind, RankedEvent};
use crate::value_objects::Location;
use crate::{CharacterId, DomainError, EventId, RoomId, SceneId, ThemeId};

// =============================================================================
// Connections
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    #[default]
    Scene,
    Room,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Scene => "scene",
            TransitionKind::Room => "room",
        }
    }

    /// Lenient parse of generated text (`"room"`, `"Room"`, `" scene "`).
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scene" => Some(TransitionKind::Scene),
            "room" => Some(TransitionKind::Room),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate on a connection. All declared conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionPrerequisite {
    /// Events that must already be recorded as fired (this turn's event counts).
    #[serde(default)]
    pub required_events: Vec<EventId>,
    /// In-game minutes that must have been spent at the current location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_minutes_in_location: Option<f64>,
    /// At least one participant's action must have been adjudicated a success.
    #[serde(default)]
    pub requires_successful_action: bool,
}

/// Facts a prerequisite is checked against.
#[derive(Debug, Clone, Copy)]
pub struct PrerequisiteContext<'a> {
    pub triggered_events: &'a [EventId],
    pub minutes_in_location: f64,
    pub any_action_succeeded: bool,
}

impl TransitionPrerequisite {
    pub fn is_open(&self) -> bool {
        self.required_events.is_empty()
            && self.min_minutes_in_location.is_none()
            && !self.requires_successful_action
    }

    /// `Err` carries a human-readable reason the gate is closed.
    pub fn check(&self, ctx: &PrerequisiteContext<'_>) -> Result<(), String> {
        if let Some(missing) = self
            .required_events
            .iter()
            .find(|event| !ctx.triggered_events.contains(event))
        {
            return Err(format!("event '{missing}' has not happened yet"));
        }

        if let Some(min) = self.min_minutes_in_location {
            if ctx.minutes_in_location < min {
                return Err(format!(
                    "needs {min} minutes at the current location, only {:.1} spent",
                    ctx.minutes_in_location
                ));
            }
        }

        if self.requires_successful_action && !ctx.any_action_succeeded {
            return Err("the action required to move on did not succeed".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub target: String,
    #[serde(default, rename = "type")]
    pub kind: TransitionKind,
    #[serde(default)]
    pub prerequisite: TransitionPrerequisite,
    #[serde(default)]
    pub description: String,
}

impl Connection {
    pub fn to_scene(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: TransitionKind::Scene,
            prerequisite: TransitionPrerequisite::default(),
            description: String::new(),
        }
    }

    pub fn to_room(target: impl Into<String>) -> Self {
        Self {
            kind: TransitionKind::Room,
            ..Self::to_scene(target)
        }
    }

    pub fn with_prerequisite(mut self, prerequisite: TransitionPrerequisite) -> Self {
        self.prerequisite = prerequisite;
        self
    }
}

// =============================================================================
// Scenes and rooms
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub events: Vec<CandidateEvent>,
    #[serde(default)]
    pub monsters: Vec<CandidateMonster>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_starting: bool,
    #[serde(default)]
    pub events: Vec<CandidateEvent>,
    #[serde(default)]
    pub monsters: Vec<CandidateMonster>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Scene {
    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| &room.id == room_id)
    }
}

// =============================================================================
// Graph
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryGraph {
    pub theme: ThemeId,
    #[serde(default)]
    pub title: String,
    /// Role the player plays when the request does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_role: Option<String>,
    /// Characters the narrative cannot run without (the player surrogate).
    #[serde(default)]
    pub required_characters: Vec<CharacterId>,
    pub scenes: Vec<Scene>,
}

impl StoryGraph {
    /// The explicitly flagged starting scene, else the first declared one.
    pub fn starting_scene(&self) -> Result<&Scene, DomainError> {
        self.scenes
            .iter()
            .find(|scene| scene.is_starting)
            .or_else(|| self.scenes.first())
            .ok_or_else(|| {
                DomainError::validation(format!("story graph '{}' declares no scenes", self.theme))
            })
    }

    pub fn scene(&self, scene_id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|scene| &scene.id == scene_id)
    }

    /// Room lookup across all scenes, returning the room's parent too.
    pub fn room(&self, room_id: &RoomId) -> Option<(&Scene, &Room)> {
        self.scenes
            .iter()
            .find_map(|scene| scene.room(room_id).map(|room| (scene, room)))
    }

    pub fn parent_scene(&self, room_id: &RoomId) -> Option<&SceneId> {
        self.room(room_id).map(|(scene, _)| &scene.id)
    }

    pub fn requires_characters(&self) -> bool {
        !self.required_characters.is_empty()
    }

    /// Outgoing edges of the location. Inside a room only the room's own
    /// connections apply.
    pub fn connections_from(&self, location: &Location) -> &[Connection] {
        match location {
            Location::AtScene { scene } => self
                .scene(scene)
                .map(|s| s.connections.as_slice())
                .unwrap_or_default(),
            Location::AtRoom { scene, room } => self
                .scene(scene)
                .and_then(|s| s.room(room))
                .map(|r| r.connections.as_slice())
                .unwrap_or_default(),
        }
    }

    /// The outgoing edge whose target is `target`, if one exists.
    pub fn find_connection(&self, location: &Location, target: &str) -> Option<&Connection> {
        let target = target.trim();
        self.connections_from(location)
            .iter()
            .find(|connection| connection.target == target)
    }

    /// Where following `connection` lands. Room targets resolve their parent
    /// scene; scene targets leave every room.
    pub fn resolve_target(&self, connection: &Connection) -> Result<Location, DomainError> {
        match connection.kind {
            TransitionKind::Scene => {
                let scene_id = SceneId::new(connection.target.clone());
                self.scene(&scene_id)
                    .map(|_| Location::AtScene { scene: scene_id.clone() })
                    .ok_or_else(|| DomainError::not_found("Scene", scene_id.as_str()))
            }
            TransitionKind::Room => {
                let room_id = RoomId::new(connection.target.clone());
                self.parent_scene(&room_id)
                    .map(|scene| Location::AtRoom {
                        scene: scene.clone(),
                        room: room_id.clone(),
                    })
                    .ok_or_else(|| DomainError::not_found("Room", room_id.as_str()))
            }
        }
    }

    /// Events bound to the location, in declaration order (scene first, then room).
    pub fn potential_events(&self, location: &Location) -> Vec<RankedEvent<'_>> {
        let Some(scene) = self.scene(location.scene_id()) else {
            return Vec::new();
        };
        let room_events = location
            .room_id()
            .and_then(|room| scene.room(room))
            .map(|room| room.events.as_slice())
            .unwrap_or_default();

        scene
            .events
            .iter()
            .chain(room_events)
            .enumerate()
            .map(|(declaration_index, event)| RankedEvent {
                declaration_index,
                event,
            })
            .collect()
    }

    /// Monsters bound to the scene or the current room.
    pub fn potential_monsters(&self, location: &Location) -> Vec<&CandidateMonster> {
        let Some(scene) = self.scene(location.scene_id()) else {
            return Vec::new();
        };
        let room_monsters = location
            .room_id()
            .and_then(|room| scene.room(room))
            .map(|room| room.monsters.as_slice())
            .unwrap_or_default();

        scene.monsters.iter().chain(room_monsters).collect()
    }

    /// Player-facing `(region, specific location)` names. Never returns ids
    /// unless the authored content left the name blank.
    pub fn location_names(&self, location: &Location) -> (String, String) {
        let scene = self.scene(location.scene_id());
        let region = scene
            .map(|s| display_or(&s.name, "Unknown region"))
            .unwrap_or_else(|| "Unknown region".to_string());

        let specific = match location.room_id() {
            Some(room_id) => scene
                .and_then(|s| s.room(room_id))
                .map(|r| display_or(&r.name, "Unmarked room"))
                .unwrap_or_else(|| "Unmarked room".to_string()),
            None => region.clone(),
        };

        (region, specific)
    }

    /// Visible description of the location: scene text, then room text.
    pub fn describe(&self, location: &Location) -> String {
        let Some(scene) = self.scene(location.scene_id()) else {
            return String::new();
        };
        let mut text = scene.description.trim().to_string();
        if let Some(room) = location.room_id().and_then(|id| scene.room(id)) {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(room.description.trim());
        }
        text
    }

    /// Check authored content for dangling references and duplicate ids.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.starting_scene()?;

        let mut scene_ids = HashSet::new();
        let mut room_ids = HashSet::new();
        for scene in &self.scenes {
            if !scene_ids.insert(scene.id.as_str()) {
                return Err(DomainError::validation(format!("duplicate scene id '{}'", scene.id)));
            }
            for room in &scene.rooms {
                if !room_ids.insert(room.id.as_str()) {
                    return Err(DomainError::validation(format!("duplicate room id '{}'", room.id)));
                }
            }
        }

        let core_events: HashSet<&str> = self
            .scenes
            .iter()
            .flat_map(|scene| {
                scene
                    .events
                    .iter()
                    .chain(scene.rooms.iter().flat_map(|room| room.events.iter()))
            })
            .filter(|event| event.kind == EventKind::Core)
            .map(|event| event.id.as_str())
            .collect();

        let all_connections = self.scenes.iter().flat_map(|scene| {
            scene
                .connections
                .iter()
                .chain(scene.rooms.iter().flat_map(|room| room.connections.iter()))
        });
        for connection in all_connections {
            let known = match connection.kind {
                TransitionKind::Scene => scene_ids.contains(connection.target.as_str()),
                TransitionKind::Room => room_ids.contains(connection.target.as_str()),
            };
            if !known {
                return Err(DomainError::validation(format!(
                    "connection points at unknown {} '{}'",
                    connection.kind, connection.target
                )));
            }
            // Random events are flavor and never gate a transition
            if let Some(gate) = connection
                .prerequisite
                .required_events
                .iter()
                .find(|event| !core_events.contains(event.as_str()))
            {
                return Err(DomainError::validation(format!(
                    "exit to '{}' requires '{gate}', which is not a core event",
                    connection.target
                )));
            }
        }

        Ok(())
    }
}

fn display_or(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{select_event, EventKind};

    fn graph() -> StoryGraph {
        StoryGraph {
            theme: ThemeId::new("vault_heist"),
            title: "Vault Heist".into(),
            player_role: Some("the safecracker".into()),
            required_characters: vec![],
            scenes: vec![
                Scene {
                    id: SceneId::new("scene_001"),
                    name: "Bank Lobby".into(),
                    description: "Marble floors.".into(),
                    is_starting: false,
                    events: vec![CandidateEvent::new("alarm", EventKind::Core)],
                    monsters: vec![CandidateMonster::new("guard", "Night Guard")],
                    rooms: vec![Room {
                        id: RoomId::new("room_001_001"),
                        name: "Vault".into(),
                        description: "Steel everywhere.".into(),
                        events: vec![CandidateEvent::new("rats", EventKind::Random)],
                        monsters: vec![CandidateMonster::new("golem", "Iron Golem")],
                        connections: vec![Connection::to_scene("scene_001")],
                    }],
                    connections: vec![
                        Connection::to_room("room_001_001"),
                        Connection::to_scene("scene_002"),
                    ],
                },
                Scene {
                    id: SceneId::new("scene_002"),
                    name: "Street".into(),
                    description: String::new(),
                    is_starting: false,
                    events: vec![],
                    monsters: vec![],
                    rooms: vec![],
                    connections: vec![],
                },
            ],
        }
    }

    fn lobby() -> Location {
        Location::AtScene { scene: SceneId::new("scene_001") }
    }

    #[test]
    fn starting_scene_falls_back_to_first() {
        assert_eq!(graph().starting_scene().unwrap().id.as_str(), "scene_001");

        let mut flagged = graph();
        flagged.scenes[1].is_starting = true;
        assert_eq!(flagged.starting_scene().unwrap().id.as_str(), "scene_002");
    }

    #[test]
    fn room_target_resolves_parent_scene() {
        let graph = graph();
        let connection = graph.find_connection(&lobby(), "room_001_001").unwrap();
        let location = graph.resolve_target(connection).unwrap();
        assert_eq!(
            location,
            Location::AtRoom {
                scene: SceneId::new("scene_001"),
                room: RoomId::new("room_001_001"),
            }
        );
    }

    #[test]
    fn unknown_edges_are_not_found() {
        assert!(graph().find_connection(&lobby(), "scene_404").is_none());
    }

    #[test]
    fn room_inherits_scene_candidates() {
        let graph = graph();
        let vault = Location::AtRoom {
            scene: SceneId::new("scene_001"),
            room: RoomId::new("room_001_001"),
        };
        let monsters: Vec<&str> = graph
            .potential_monsters(&vault)
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(monsters, vec!["guard", "golem"]);

        let chosen = select_event(graph.potential_events(&vault)).unwrap();
        assert_eq!(chosen.id.as_str(), "alarm");
    }

    #[test]
    fn location_names_never_expose_ids() {
        let graph = graph();
        let vault = Location::AtRoom {
            scene: SceneId::new("scene_001"),
            room: RoomId::new("room_001_001"),
        };
        assert_eq!(
            graph.location_names(&vault),
            ("Bank Lobby".to_string(), "Vault".to_string())
        );
        let (region, _) = graph.location_names(&Location::AtScene {
            scene: SceneId::new("scene_404"),
        });
        assert_eq!(region, "Unknown region");
    }

    #[test]
    fn validate_rejects_dangling_connections() {
        let mut broken = graph();
        broken.scenes[1].connections.push(Connection::to_room("room_999"));
        assert!(broken.validate().is_err());
        assert!(graph().validate().is_ok());
    }

    #[test]
    fn validate_only_lets_core_events_gate_exits() {
        let gated = |event: &str| {
            let mut graph = graph();
            graph.scenes[0].connections[1] = Connection::to_scene("scene_002").with_prerequisite(
                TransitionPrerequisite {
                    required_events: vec![EventId::new(event)],
                    ..TransitionPrerequisite::default()
                },
            );
            graph
        };

        assert!(gated("alarm").validate().is_ok());
        let err = gated("rats").validate().unwrap_err();
        assert!(err.to_string().contains("'rats'"));
        assert!(gated("earthquake").validate().is_err());
    }

    #[test]
    fn prerequisite_reports_first_unmet_condition() {
        let gate = TransitionPrerequisite {
            required_events: vec![EventId::new("alarm")],
            min_minutes_in_location: Some(10.0),
            requires_successful_action: true,
        };
        let fired = vec![EventId::new("alarm")];

        let early = PrerequisiteContext {
            triggered_events: &fired,
            minutes_in_location: 2.0,
            any_action_succeeded: true,
        };
        assert!(gate.check(&early).unwrap_err().contains("minutes"));

        let failed = PrerequisiteContext {
            minutes_in_location: 15.0,
            any_action_succeeded: false,
            ..early
        };
        assert!(gate.check(&failed).is_err());

        let ok = PrerequisiteContext {
            any_action_succeeded: true,
            ..failed
        };
        assert!(gate.check(&ok).is_ok());
        assert!(TransitionPrerequisite::default().is_open());
    }
}
