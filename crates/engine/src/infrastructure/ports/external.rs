//! Ports to things outside the engine: the Oracle, a human operator and the
//! wall clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::LlmError;

// =============================================================================
// Oracle
// =============================================================================

/// One stateless Oracle call: an optional system prompt followed by the
/// conversation, oldest first.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    /// Ask the backend to constrain output to a single JSON object.
    pub json_output: bool,
}

impl LlmRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn expecting_json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Raw generated text. Parsing it is the call site's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub content: String,
    /// Generation stopped at the backend's length limit.
    pub truncated: bool,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            truncated: false,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}

// =============================================================================
// Human confirmation
// =============================================================================

/// Asks a human whether to keep calling the Oracle after repeated failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfirmationPort: Send + Sync {
    /// `true` to continue, `false` to abort the in-flight turn.
    async fn confirm(&self, consecutive_failures: u32, last_error: String) -> bool;
}

// =============================================================================
// Wall clock
// =============================================================================

/// Real time, as opposed to the story's `GameTime`. Stamps history records.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
