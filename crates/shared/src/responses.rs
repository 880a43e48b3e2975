//! Response bodies of the Turn API.
//!
//! A turn response is split the way the engine splits character state:
//! `surface` is safe to show the player, `hidden` is for operators and tooling.

use serde::{Deserialize, Serialize};

// =============================================================================
// Turn response
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    /// Id of the turn, matches the engine's log span.
    pub turn_id: String,
    pub surface: SurfaceDto,
    pub hidden: HiddenDto,
    pub decision: DecisionMetadataDto,
    /// Snapshot this turn produced.
    pub new_step: String,
    #[serde(default)]
    pub step_timings: Vec<StepTimingDto>,
}

/// Player-visible part of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDto {
    pub responses: Vec<CharacterResponseDto>,
    pub summary: String,
    pub environment_status: EnvironmentStatusDto,
    pub decision_points: DecisionPointDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterResponseDto {
    pub character_id: String,
    pub name: String,
    pub dialogue: String,
    pub action: String,
    /// The character's worker failed and this entry is a stand-in.
    #[serde(default)]
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentStatusDto {
    /// Rendered game clock, e.g. `Day 1 12:05`.
    pub time: String,
    pub location: LocationStatusDto,
    /// Authored description of where the party is after the turn.
    #[serde(default)]
    pub scene_description: String,
    pub current_narrative: String,
    #[serde(default)]
    pub changes_summary: Vec<String>,
}

/// Display names only; technical scene/room ids never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStatusDto {
    pub region: String,
    pub specific_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPointDto {
    pub has_decision: bool,
    pub description: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Operator-visible part of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenDto {
    pub execution_results: Vec<ExecutionResultDto>,
    pub raw_responses: Vec<RawResponseDto>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResultDto {
    pub character_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub actual_outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponseDto {
    pub character_id: String,
    pub inner_monologue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the validated Director decision did this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetadataDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_event: Option<String>,
    #[serde(default)]
    pub appeared_monsters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionDto>,
    /// Why a proposed event or transition was refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<String>,
    pub elapsed_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDto {
    pub target: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTimingDto {
    pub step: String,
    pub millis: u64,
}

// =============================================================================
// Saves and escalation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStepDto {
    pub step: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStepsResponse {
    pub theme: String,
    /// Numeric order, oldest first.
    pub steps: Vec<SaveStepDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveCreatedResponse {
    pub theme: String,
    pub step: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStatusResponse {
    pub consecutive_failures: u32,
    pub threshold: u32,
    pub awaiting_confirmation: bool,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details<T: Serialize>(mut self, details: T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }
}

/// Error classification codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Client Errors (4xx) ===
    /// Request was malformed or invalid
    BadRequest,
    /// Requested theme or snapshot not found
    NotFound,
    /// Request data failed validation (empty instruction, missing scene)
    ValidationError,
    /// Repeated oracle failures need a human decision before continuing
    EscalationRequired,
    /// A human declined to continue after repeated oracle failures
    EscalationDeclined,

    // === Server Errors (5xx) ===
    /// Internal server error
    InternalError,

    /// Unknown variant for forward compatibility
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_use_screaming_snake_case() {
        let body = ErrorResponse::new(ErrorCode::EscalationRequired, "confirm to continue");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "ESCALATION_REQUIRED");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn unknown_error_codes_are_tolerated() {
        let code: ErrorCode = serde_json::from_str("\"RATE_LIMITED\"").unwrap();
        assert_eq!(code, ErrorCode::Unknown);
    }
}
