use std::fmt::Write;

use super::DirectorBrief;

const RESPONSE_SCHEMA: &str = r#"{
  "environment_analysis": {
    "updated_scene_description": "one paragraph fusing every character's words and outcomes",
    "scene_state_changes": {},
    "agent_execution_results": [
      {"character_id": "id", "character_name": "name",
       "execution_result": {"success": true, "failure_reason": "", "actual_outcome": "what actually happened"},
       "attribute_changes": {}}
    ]
  },
  "director_decision": {
    "trigger_event": "one event id or null",
    "event_description": "",
    "appear_monster": ["monster ids"],
    "monster_description": "",
    "transition_target": "a listed exit target or null",
    "transition_type": "scene or room",
    "elapsed_time": 1,
    "reasoning": ""
  },
  "decision_point": {"has_decision": false, "description": "", "options": []}
}"#;

pub(super) fn system_prompt(brief: &DirectorBrief<'_>) -> String {
    let mut prompt = String::from(
        "You are the Director of an interactive story. For every character, \
         decide whether the action they attempted succeeds given the scene, and \
         describe what actually happens. Then write ONE narrative paragraph that \
         weaves all of it together (never a list per character).\n\n\
         Afterwards decide what the world does:\n\
         - fire at most ONE of the listed events, only if its trigger conditions are met; \
         core events take precedence over random ones\n\
         - introduce zero or more of the listed monsters\n\
         - move the party only through one of the listed exits, and only if \
         the action that leads there succeeded\n\
         - estimate how many in-game minutes the turn took\n",
    );
    if !brief.graph.title.trim().is_empty() {
        let _ = writeln!(prompt, "\nStory: {}", brief.graph.title.trim());
    }
    prompt.push_str("\nReply with a single JSON object and nothing else:\n");
    prompt.push_str(RESPONSE_SCHEMA);
    prompt
}

pub(super) fn user_prompt(brief: &DirectorBrief<'_>) -> String {
    let location = brief.scene_state.location();
    let graph = brief.graph;
    let (region, specific) = graph.location_names(&location);
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Location: {region} / {specific} ({location})");
    let _ = writeln!(
        prompt,
        "Time: {} ({:.0} minutes spent here)",
        brief.game_time,
        brief.scene_state.minutes_in_location(brief.game_time)
    );
    let _ = writeln!(prompt, "\n{}\n", graph.describe(&location));
    let _ = writeln!(prompt, "Player instruction: {}\n", brief.briefing.instruction);

    prompt.push_str("Characters:\n");
    for actor in brief.actors {
        let intent = actor.outcome.action_intent();
        let _ = writeln!(
            prompt,
            "- {} ({}): says \"{}\"; attempts: {}",
            actor.character.display_name(),
            actor.character.id,
            actor.outcome.dialogue(),
            if intent.is_empty() { "nothing" } else { intent }
        );
    }

    let triggered = &brief.scene_state.triggered_event_ids;
    let events = graph.potential_events(&location);
    prompt.push_str("\nEvents:\n");
    if events.is_empty() {
        prompt.push_str("- none\n");
    }
    for ranked in events {
        let event = ranked.event;
        let status = if event.is_available(triggered) {
            "available"
        } else {
            "already happened"
        };
        let kind = if event.kind.is_core() { "core" } else { "random" };
        let _ = writeln!(
            prompt,
            "- {} [{kind}, priority {}, {status}]: {} (when: {})",
            event.id,
            event.priority,
            event.display_name(),
            event.trigger_conditions
        );
    }

    let monsters = graph.potential_monsters(&location);
    prompt.push_str("\nMonsters:\n");
    if monsters.is_empty() {
        prompt.push_str("- none\n");
    }
    for monster in monsters {
        let _ = writeln!(
            prompt,
            "- {} ({}): appears when {}",
            monster.id, monster.name, monster.appearance_conditions
        );
    }

    let exits = graph.connections_from(&location);
    prompt.push_str("\nExits:\n");
    if exits.is_empty() {
        prompt.push_str("- none\n");
    }
    for exit in exits {
        let _ = write!(prompt, "- {} [{}]", exit.target, exit.kind);
        if !exit.description.trim().is_empty() {
            let _ = write!(prompt, ": {}", exit.description.trim());
        }
        let gate = &exit.prerequisite;
        if !gate.is_open() {
            let mut needs = Vec::new();
            if !gate.required_events.is_empty() {
                let required: Vec<&str> = gate.required_events.iter().map(|e| e.as_str()).collect();
                needs.push(format!("after {}", required.join(", ")));
            }
            if let Some(min) = gate.min_minutes_in_location {
                needs.push(format!("after {min} minutes here"));
            }
            if gate.requires_successful_action {
                needs.push("a successful action".to_string());
            }
            let _ = write!(prompt, " (requires {})", needs.join("; "));
        }
        prompt.push('\n');
    }

    prompt
}
