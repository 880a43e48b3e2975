use std::fmt::Write;

use storyloom_domain::CharacterRecord;

use super::SceneBriefing;

const RESPONSE_SCHEMA: &str = r#"{
  "dialogue": "what you say out loud, in character",
  "action_intent": "what you try to do this turn (intent only)",
  "inner_monologue": "private thoughts nobody else hears",
  "perceived_state": {"optional": "how you appear to others right now"}
}"#;

pub(super) fn system_prompt(character: &CharacterRecord, briefing: &SceneBriefing) -> String {
    let mut prompt = format!(
        "You are {}, a character in an interactive story.\n",
        character.display_name()
    );
    if !character.description.trim().is_empty() {
        let _ = writeln!(prompt, "About you: {}", character.description.trim());
    }
    if !character.attributes.is_empty() {
        let attributes = serde_json::Value::Object(character.attributes.clone());
        let _ = writeln!(prompt, "Your current attributes: {attributes}");
    }
    if !character.state.surface.is_empty() {
        let surface = serde_json::Value::Object(character.state.surface.clone());
        let _ = writeln!(prompt, "How you currently appear: {surface}");
    }
    if let Some(role) = &briefing.player_role {
        let _ = writeln!(prompt, "The player speaking to the party is {role}.");
    }

    prompt.push_str(
        "\nReact to the player's instruction in character. Describe only what you \
         say and what you attempt. Never state whether your attempt succeeds: \
         \"I climb the wall\" is fine, \"I successfully climb the wall\" is not.\n\
         Reply with a single JSON object and nothing else:\n",
    );
    prompt.push_str(RESPONSE_SCHEMA);
    prompt
}

pub(super) fn user_prompt(briefing: &SceneBriefing) -> String {
    let mut prompt = format!(
        "Location: {}\nTime: {}\n\n{}\n",
        briefing.location_name, briefing.time, briefing.scene_text
    );
    if !briefing.history.is_empty() {
        prompt.push_str("\nEarlier turns:\n");
        for record in &briefing.history {
            let _ = writeln!(prompt, "- \"{}\" -> {}", record.instruction, record.summary);
        }
    }
    let _ = write!(prompt, "\nPlayer instruction: {}", briefing.instruction);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    #[test]
    fn system_prompt_forbids_self_resolution() {
        let character = test_fixtures::crew().remove(0);
        let prompt = system_prompt(&character, &test_fixtures::briefing("open the vault"));
        assert!(prompt.contains(character.display_name()));
        assert!(prompt.contains("Never state whether your attempt succeeds"));
        assert!(prompt.contains("action_intent"));
    }

    #[test]
    fn user_prompt_carries_instruction_and_scene() {
        let briefing = test_fixtures::briefing("open the vault");
        let prompt = user_prompt(&briefing);
        assert!(prompt.contains("Bank Lobby"));
        assert!(prompt.ends_with("Player instruction: open the vault"));
    }
}
