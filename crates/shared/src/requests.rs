use serde::{Deserialize, Serialize};

/// Body of `POST /api/themes/{theme}/execute`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub instruction: String,
    /// Snapshot to play from (`"<n>_step"`). Latest when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_step: Option<String>,
    /// Participating characters. Every character of the theme when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_role: Option<String>,
}

impl ExecuteRequest {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Self::default()
        }
    }

    pub fn from_step(mut self, step: impl Into<String>) -> Self {
        self.save_step = Some(step.into());
        self
    }
}

/// Body of `POST /api/escalation/confirm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmEscalationRequest {
    pub continue_calls: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_may_be_omitted() {
        let request: ExecuteRequest =
            serde_json::from_str(r#"{"instruction": "we head into the vault"}"#).unwrap();
        assert_eq!(request, ExecuteRequest::new("we head into the vault"));
    }
}
