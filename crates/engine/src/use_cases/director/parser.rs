//! Lenient reading of the Director's two-part reply.
//!
//! ```json
//! {
//!   "environment_analysis": {
//!     "updated_scene_description": "...",
//!     "scene_state_changes": {},
//!     "agent_execution_results": [
//!       {"character_id": "char_001", "character_name": "Mira",
//!        "execution_result": {"success": true, "failure_reason": "", "actual_outcome": "..."},
//!        "attribute_changes": {}}
//!     ]
//!   },
//!   "director_decision": {
//!     "trigger_event": "event id | [ids] | null",
//!     "event_description": "...",
//!     "appear_monster": "monster | [monsters] | null",
//!     "monster_description": "...",
//!     "transition_target": "scene or room id | null",
//!     "transition_type": "scene | room",
//!     "elapsed_time": 5,
//!     "reasoning": "..."
//!   },
//!   "decision_point": {"has_decision": false, "description": "", "options": []}
//! }
//! ```
//!
//! Models are loose with types here: ids arrive as numbers, booleans as
//! strings, lists as single strings and "nothing" as `"null"`. Everything is
//! read through `serde_json::Value` and coerced.

use serde::Deserialize;
use serde_json::{Map, Value};
use storyloom_domain::common::optional_token;
use storyloom_domain::{
    AgentExecutionResult, CharacterId, DecisionPoint, DirectorDecision, EventId, MonsterId,
    TransitionKind,
};

use crate::use_cases::oracle_text::{parse_record, OracleParseError};

#[derive(Debug, Deserialize)]
struct RawDirectorReply {
    #[serde(default)]
    environment_analysis: RawAnalysis,
    director_decision: RawDecision,
    #[serde(default)]
    decision_point: Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    updated_scene_description: String,
    #[serde(default)]
    scene_state_changes: Value,
    #[serde(default)]
    agent_execution_results: Vec<RawExecution>,
}

#[derive(Debug, Deserialize)]
struct RawExecution {
    #[serde(default)]
    character_id: Value,
    #[serde(default)]
    character_name: String,
    #[serde(default)]
    execution_result: RawExecutionResult,
    #[serde(default)]
    attribute_changes: Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawExecutionResult {
    #[serde(default)]
    success: Value,
    #[serde(default)]
    failure_reason: Value,
    #[serde(default)]
    actual_outcome: String,
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    trigger_event: Value,
    #[serde(default)]
    event_description: String,
    #[serde(default)]
    appear_monster: Value,
    #[serde(default)]
    monster_description: String,
    #[serde(default)]
    transition_target: Value,
    #[serde(default)]
    transition_type: Value,
    #[serde(default)]
    elapsed_time: Value,
    #[serde(default)]
    reasoning: String,
}

/// Parse raw Director text into an unvalidated decision.
pub fn parse_decision(raw: &str, default_elapsed_minutes: f64) -> Result<DirectorDecision, OracleParseError> {
    let reply: RawDirectorReply = parse_record(raw)?;
    let analysis = reply.environment_analysis;
    let decision = reply.director_decision;

    let agent_execution_results = analysis
        .agent_execution_results
        .into_iter()
        .filter_map(|raw| {
            let id = token(&raw.character_id).or_else(|| optional_token(&raw.character_name))?;
            let result = raw.execution_result;
            Some(AgentExecutionResult {
                character_id: CharacterId::new(id),
                success: truthy(&result.success),
                failure_reason: token(&result.failure_reason),
                actual_outcome: result.actual_outcome.trim().to_string(),
                attribute_changes: object(raw.attribute_changes),
            })
        })
        .collect();

    let mut events = tokens(&decision.trigger_event).into_iter().map(EventId::new);
    let trigger_event_id = events.next();
    let competing_event_ids = events.collect();

    Ok(DirectorDecision {
        agent_execution_results,
        updated_narrative: analysis.updated_scene_description.trim().to_string(),
        scene_state_changes: object(analysis.scene_state_changes),
        trigger_event_id,
        competing_event_ids,
        event_narration: decision.event_description.trim().to_string(),
        appear_monsters: tokens(&decision.appear_monster)
            .into_iter()
            .map(MonsterId::new)
            .collect(),
        monster_narration: decision.monster_description.trim().to_string(),
        transition_target: token(&decision.transition_target),
        transition_kind: token(&decision.transition_type)
            .and_then(|kind| TransitionKind::parse_lenient(&kind)),
        elapsed_minutes: minutes(&decision.elapsed_time).unwrap_or(default_elapsed_minutes),
        reasoning: decision.reasoning.trim().to_string(),
        blocking_reason: None,
        decision_point: serde_json::from_value::<DecisionPoint>(reply.decision_point)
            .unwrap_or_default(),
    })
}

fn token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => optional_token(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn tokens(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(token).collect(),
        other => token(other).into_iter().collect(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "success" | "succeeded"
        ),
        _ => false,
    }
}

/// Usable elapsed minutes, or `None` for anything negative or non-numeric.
fn minutes(value: &Value) -> Option<f64> {
    let minutes = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (minutes.is_finite() && minutes >= 0.0).then_some(minutes)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
