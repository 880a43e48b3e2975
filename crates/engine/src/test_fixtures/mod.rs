//! Test fixtures: the sample `vault_heist` theme and a scripted Oracle.
//!
//! The story graph lives in `test_data/vault_heist/story_graph.json`:
//!
//! ```text
//! scene_001 "Bank Lobby" (start)     events: vault_alarm (core)   monsters: night_guard
//!   -> room_001_001 [room]
//!   room_001_001 "Vault"             events: coin_spill (random)
//!     -> scene_002 [scene]           requires a successful action
//!     -> scene_001 [scene]
//! scene_002 "Rooftops"
//!   -> scene_001 [scene]
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use storyloom_domain::{
    CharacterRecord, ConversationHistory, GameTime, Location, SceneState, StoryGraph,
};

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse, SnapshotContents};
use crate::use_cases::agents::SceneBriefing;

pub const THEME: &str = "vault_heist";

// =============================================================================
// Fixture Loading
// =============================================================================

/// Load a JSON fixture from the `test_data/` directory.
///
/// # Panics
///
/// Panics if the fixture file cannot be read or parsed.
pub fn load_fixture<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(path);
    let content = std::fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!("Failed to read fixture '{}': {}", fixture_path.display(), e)
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        panic!("Failed to parse fixture '{}': {}", fixture_path.display(), e)
    })
}

// =============================================================================
// Theme Fixtures
// =============================================================================

pub fn vault_graph() -> StoryGraph {
    load_fixture("vault_heist/story_graph.json")
}

/// Mira (the required player surrogate) and Oskar.
pub fn crew() -> Vec<CharacterRecord> {
    vec![
        CharacterRecord::new("char_001", "Mira")
            .with_description("Safecracker with steady hands and no patience.")
            .with_theme(THEME)
            .with_attribute("vitals", json!({"hp": 10, "stamina": 10}))
            .with_attribute("equipment", json!(["stethoscope", "pry bar"])),
        CharacterRecord::new("char_002", "Oskar")
            .with_description("Lookout. Talks too much when nervous.")
            .with_theme(THEME)
            .with_attribute("vitals", json!({"hp": 14, "stamina": 6})),
    ]
}

/// What `0_step` of the sample theme holds.
pub fn initial_contents() -> SnapshotContents {
    let graph = vault_graph();
    let time = GameTime::start();
    let start = graph.starting_scene().map(|s| s.id.clone()).unwrap();
    SnapshotContents {
        scene_state: SceneState::new(Location::AtScene { scene: start }, &time),
        game_time: time,
        characters: crew(),
        history: ConversationHistory::new(),
    }
}

pub fn briefing(instruction: &str) -> SceneBriefing {
    let graph = vault_graph();
    let contents = initial_contents();
    let location = contents.scene_state.location();
    SceneBriefing {
        instruction: instruction.to_string(),
        scene_text: graph.describe(&location),
        location_name: graph.location_names(&location).1,
        time: contents.game_time.to_string(),
        history: Vec::new(),
        player_role: graph.player_role.clone(),
    }
}

// =============================================================================
// Oracle Replies
// =============================================================================

pub fn worker_reply(dialogue: &str, action: &str) -> String {
    json!({
        "dialogue": dialogue,
        "action_intent": action,
        "inner_monologue": format!("thinking about: {action}"),
        "perceived_state": {"posture": "alert"}
    })
    .to_string()
}

/// Director reply in which every crew action succeeds and the party moves
/// to `target`.
pub fn director_reply_to(target: &str, kind: &str) -> String {
    director_reply(json!({
        "trigger_event": null,
        "appear_monster": [],
        "transition_target": target,
        "transition_type": kind,
        "elapsed_time": 5,
        "reasoning": "The crew did what they set out to do."
    }))
}

/// Director reply with the given `director_decision` section.
pub fn director_reply(decision: serde_json::Value) -> String {
    json!({
        "environment_analysis": {
            "updated_scene_description": "Mira works the lock while Oskar watches the street.",
            "scene_state_changes": {"lobby_lights": "dimmed"},
            "agent_execution_results": [
                {"character_id": "char_001", "character_name": "Mira",
                 "execution_result": {"success": true, "failure_reason": "", "actual_outcome": "The lock gives."},
                 "attribute_changes": {"vitals": {"stamina": 8}}},
                {"character_id": "char_002", "character_name": "Oskar",
                 "execution_result": {"success": true, "failure_reason": "", "actual_outcome": "Nobody is coming."}}
            ]
        },
        "director_decision": decision
    })
    .to_string()
}

// =============================================================================
// Scripted Oracle
// =============================================================================

/// Oracle fake answering the Director and each character from a script.
///
/// Workers are recognised by the character name their system prompt opens
/// with; characters without a scripted reply get a generic one.
#[derive(Default)]
pub struct ScriptedLlm {
    workers: HashMap<String, Result<String, LlmError>>,
    director: Option<Result<String, LlmError>>,
    pub calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn worker(mut self, name: &str, reply: Result<String, LlmError>) -> Self {
        self.workers.insert(name.to_string(), reply);
        self
    }

    pub fn director(mut self, reply: Result<String, LlmError>) -> Self {
        self.director = Some(reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system = request.system_prompt.unwrap_or_default();

        if system.starts_with("You are the Director") {
            return match &self.director {
                Some(reply) => reply.clone().map(LlmResponse::text),
                None => Ok(LlmResponse::text(director_reply(json!({})))),
            };
        }

        let scripted = self
            .workers
            .iter()
            .find(|(name, _)| system.starts_with(&format!("You are {name},")))
            .map(|(_, reply)| reply.clone());
        match scripted {
            Some(reply) => reply.map(LlmResponse::text),
            None => Ok(LlmResponse::text(worker_reply("Ready.", "I keep watch"))),
        }
    }
}
