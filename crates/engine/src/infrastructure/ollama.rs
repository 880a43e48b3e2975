//! Oracle backed by Ollama's OpenAI-compatible `/v1/chat/completions`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
/// Generations for a whole party can be slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to a default HTTP client without timeout");
                Client::new()
            });

        Self {
            http,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body<'a>(&'a self, request: &'a LlmRequest) -> CompletionBody<'a> {
        let system = request
            .system_prompt
            .as_deref()
            .map(|content| WireMessage {
                role: "system",
                content,
            });
        let conversation = request.messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        });

        CompletionBody {
            model: &self.model,
            messages: system.into_iter().chain(conversation).collect(),
            temperature: request.temperature,
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL)
    }
}

#[async_trait]
impl LlmPort for OllamaClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Oracle usage"
            );
        }

        into_response(completion)
    }
}

fn classify_status(status: StatusCode, body: String) -> LlmError {
    if status.is_client_error() {
        LlmError::Rejected {
            status: status.as_u16(),
            body,
        }
    } else {
        LlmError::RequestFailed(format!("{status}: {body}"))
    }
}

fn into_response(completion: Completion) -> Result<LlmResponse, LlmError> {
    let Some(choice) = completion.choices.into_iter().next() else {
        return Err(LlmError::InvalidResponse("completion has no choices".into()));
    };

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        truncated: choice.finish_reason.as_deref() == Some("length"),
    })
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::ChatMessage;

    fn client() -> OllamaClient {
        OllamaClient::new("http://oracle.local:11434/", "test-model")
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(
            client().endpoint,
            "http://oracle.local:11434/v1/chat/completions"
        );
    }

    #[test]
    fn body_puts_system_prompt_first_and_requests_json() {
        let request = LlmRequest::new(vec![ChatMessage::user("we head into the vault")])
            .with_system_prompt("You are the Director.")
            .with_temperature(0.4)
            .expecting_json();
        let client = client();

        let body = serde_json::to_value(client.body(&request)).unwrap();

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "we head into the vault");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn body_omits_unset_options() {
        let request = LlmRequest::new(vec![ChatMessage::user("look around")]);
        let client = client();

        let body = serde_json::to_value(client.body(&request)).unwrap();

        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        assert!(body.get("temperature").is_none());
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn length_stop_marks_truncation() {
        let completion: Completion = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{}"},"finish_reason":"length"}]}"#,
        )
        .unwrap();

        let response = into_response(completion).unwrap();

        assert_eq!(response.content, "{}");
        assert!(response.truncated);
    }

    #[test]
    fn missing_choices_are_unreadable() {
        let completion: Completion = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            into_response(completion),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn client_errors_are_rejections_and_server_errors_are_failures() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "model not found".into()),
            LlmError::Rejected { status: 404, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            LlmError::RequestFailed(_)
        ));
    }
}
