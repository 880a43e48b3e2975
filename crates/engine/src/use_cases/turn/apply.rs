//! Fold a validated ruling into the state of the next snapshot.
//!
//! Pure: takes the source snapshot's state by reference and returns the
//! contents to write into the fork. The source is never modified.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use storyloom_domain::{CharacterRecord, ConversationRecord, GameTime, SceneState, StoryGraph};

use super::aggregate::TurnReactions;
use crate::infrastructure::ports::{Snapshot, SnapshotContents};
use crate::use_cases::director::Ruling;

/// Inputs of one turn's state change.
pub struct TurnDelta<'a> {
    pub snapshot: &'a Snapshot,
    pub scene_state: &'a SceneState,
    pub graph: &'a StoryGraph,
    pub participants: &'a [CharacterRecord],
    pub reactions: &'a TurnReactions,
    pub ruling: &'a Ruling,
    pub instruction: &'a str,
    pub recorded_at: DateTime<Utc>,
}

/// Next snapshot contents plus the player-facing account of what changed.
#[derive(Debug, Clone)]
pub struct AppliedTurn {
    pub contents: SnapshotContents,
    pub summary: String,
    pub changes: Vec<String>,
}

pub fn apply_turn(delta: &TurnDelta<'_>) -> AppliedTurn {
    let decision = &delta.ruling.decision;
    let mut changes = Vec::new();

    // Time moves first so a new location is entered at the post-turn clock
    let game_time: GameTime = delta.snapshot.game_time.advance_minutes(decision.elapsed_minutes);
    if decision.elapsed_minutes > 0.0 {
        let unit = if decision.elapsed_minutes == 1.0 { "minute" } else { "minutes" };
        changes.push(format!("{} {unit} passed", format_minutes(decision.elapsed_minutes)));
    }

    let mut scene_state = delta.scene_state.clone();
    scene_state.merge_changes(&decision.scene_state_changes);

    if let Some(event) = &delta.ruling.event {
        if scene_state.record_event(event.id.clone()) {
            changes.push(format!("{} happened", event.display_name()));
        }
        scene_state.merge_changes(&event.effects.scene_changes);
    }

    if !delta.ruling.monsters.is_empty() {
        let appeared: Vec<Value> = delta
            .ruling
            .monsters
            .iter()
            .map(|m| json!({"id": m.id, "name": m.name}))
            .collect();
        scene_state.state_changes.insert(
            "monsters".to_string(),
            json!({"appeared": appeared, "description": decision.monster_narration}),
        );
        for monster in &delta.ruling.monsters {
            changes.push(format!("{} appeared", monster.name));
        }
    }

    if !decision.updated_narrative.is_empty() {
        scene_state.state_changes.insert(
            "current_narrative".to_string(),
            Value::String(decision.updated_narrative.clone()),
        );
    }

    let destination_name = delta.ruling.destination.as_ref().map(|destination| {
        scene_state.enter(destination.clone(), &game_time);
        let name = delta.graph.location_names(destination).1;
        changes.push(format!("Moved to {name}"));
        name
    });

    if let Some(reason) = &decision.blocking_reason {
        changes.push(format!("Could not move on: {reason}"));
    }

    let characters = delta
        .participants
        .iter()
        .map(|participant| updated_character(participant, delta, destination_name.as_deref()))
        .collect();

    let summary = summarize(delta);
    let mut history = delta.snapshot.history.clone();
    history.push(ConversationRecord {
        step: delta.snapshot.step,
        instruction: delta.instruction.to_string(),
        summary: summary.clone(),
        recorded_at: delta.recorded_at,
    });

    AppliedTurn {
        contents: SnapshotContents {
            scene_state,
            game_time,
            characters,
            history,
        },
        summary,
        changes,
    }
}

fn updated_character(
    participant: &CharacterRecord,
    delta: &TurnDelta<'_>,
    destination_name: Option<&str>,
) -> CharacterRecord {
    let mut record = participant.clone();
    let ruling = delta.ruling;

    if let Some(reaction) = delta
        .reactions
        .outcome(&record.id)
        .and_then(|outcome| outcome.reaction())
    {
        if !reaction.inner_monologue.is_empty() {
            record.set_hidden("inner_monologue", Value::String(reaction.inner_monologue.clone()));
        }
        if !reaction.action_intent.is_empty() {
            record.set_surface("last_action", Value::String(reaction.action_intent.clone()));
        }
        if let Some(perceived) = &reaction.perceived_state {
            for (key, value) in perceived {
                record.set_surface(key.clone(), value.clone());
            }
        }
    }

    if let Some(result) = ruling.decision.result_for(&record.id) {
        record.merge_attributes(&result.attribute_changes);
        if !result.actual_outcome.is_empty() {
            record.set_surface("last_outcome", Value::String(result.actual_outcome.clone()));
        }
    }

    if let Some(event) = &ruling.event {
        if !event.effects.character_changes.is_null() {
            record.set_surface("current_objective", event.effects.character_changes.clone());
        }
    }

    if !ruling.monsters.is_empty() {
        let names: Vec<&str> = ruling.monsters.iter().map(|m| m.name.as_str()).collect();
        record.set_surface(
            "combat_state",
            Value::String(format!("Encountered {}", names.join(", "))),
        );
    }

    if let Some(name) = destination_name {
        record.set_surface("location", Value::String(name.to_string()));
    }

    record
}

/// The turn as one block of prose: the fused narrative, then what the world did.
fn summarize(delta: &TurnDelta<'_>) -> String {
    let decision = &delta.ruling.decision;
    let mut parts: Vec<String> = Vec::new();

    if decision.updated_narrative.is_empty() {
        // No narrative from the Director: fall back to what was said
        for actor in delta.reactions.actors(delta.participants) {
            let dialogue = actor.outcome.dialogue();
            if !actor.outcome.is_degraded() && !dialogue.is_empty() {
                parts.push(format!("{}: \"{}\"", actor.character.display_name(), dialogue));
            }
        }
    } else {
        parts.push(decision.updated_narrative.clone());
    }

    if let Some(event) = &delta.ruling.event {
        let narration = if decision.event_narration.is_empty() {
            event.description_template.trim()
        } else {
            decision.event_narration.as_str()
        };
        if !narration.is_empty() {
            parts.push(narration.to_string());
        }
    }

    if !delta.ruling.monsters.is_empty() {
        if decision.monster_narration.is_empty() {
            parts.extend(
                delta
                    .ruling
                    .monsters
                    .iter()
                    .map(|m| m.battle_description_template.trim().to_string())
                    .filter(|text| !text.is_empty()),
            );
        } else {
            parts.push(decision.monster_narration.clone());
        }
    }

    parts.join("\n\n")
}

fn format_minutes(minutes: f64) -> String {
    if minutes.fract() == 0.0 {
        format!("{minutes:.0}")
    } else {
        format!("{minutes:.1}")
    }
}
