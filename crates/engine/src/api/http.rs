//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;

use storyloom_domain::{CharacterId, SaveStep, ThemeId};
use storyloom_shared::{
    ConfirmEscalationRequest, ErrorCode, ErrorResponse, EscalationStatusResponse, ExecuteRequest,
    SaveCreatedResponse, SaveStepDto, SaveStepsResponse, TurnResponse,
};

use crate::app::App;
use crate::infrastructure::failure_escalation::EscalationStatus;
use crate::infrastructure::ports::{EscalationError, RepoError};
use crate::use_cases::{SaveError, TurnError, TurnRequest};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/themes", get(list_themes))
        .route("/api/themes/{theme}/execute", post(execute))
        .route(
            "/api/themes/{theme}/saves",
            get(list_saves).post(create_save).delete(delete_saves),
        )
        .route("/api/themes/{theme}/saves/{step}", delete(delete_step))
        .route("/api/themes/{theme}/saves/{step}/fork", post(fork_step))
        .route("/api/escalation", get(escalation_status))
        .route("/api/escalation/confirm", post(confirm_escalation))
}

async fn health() -> &'static str {
    "OK"
}

async fn list_themes(State(app): State<Arc<App>>) -> Result<Json<Vec<String>>, ApiError> {
    let themes = app.themes.list_themes().await?;
    Ok(Json(themes.into_iter().map(ThemeId::into_inner).collect()))
}

// =============================================================================
// Turns
// =============================================================================

async fn execute(
    State(app): State<Arc<App>>,
    Path(theme): Path<String>,
    Json(body): Json<ExecuteRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let from_step = body
        .save_step
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_step)
        .transpose()?;

    let request = TurnRequest {
        theme: ThemeId::new(theme),
        instruction: body.instruction,
        from_step,
        character_ids: body
            .character_ids
            .map(|ids| ids.into_iter().map(CharacterId::new).collect()),
        player_role: body.player_role,
    };

    let response = app.use_cases.turn.process.execute(request).await?;
    Ok(Json(response))
}

// =============================================================================
// Saves
// =============================================================================

async fn list_saves(
    State(app): State<Arc<App>>,
    Path(theme): Path<String>,
) -> Result<Json<SaveStepsResponse>, ApiError> {
    let theme = ThemeId::new(theme);
    let steps = app.use_cases.saves.manage.list(&theme).await?;
    Ok(Json(SaveStepsResponse {
        theme: theme.into_inner(),
        steps: steps
            .into_iter()
            .map(|info| SaveStepDto {
                step: info.step.to_string(),
                size_bytes: info.size_bytes,
            })
            .collect(),
    }))
}

async fn create_save(
    State(app): State<Arc<App>>,
    Path(theme): Path<String>,
) -> Result<(StatusCode, Json<SaveCreatedResponse>), ApiError> {
    let theme = ThemeId::new(theme);
    let step = app.use_cases.saves.initialize.execute(&theme).await?;
    Ok((
        StatusCode::CREATED,
        Json(SaveCreatedResponse {
            theme: theme.into_inner(),
            step: step.to_string(),
        }),
    ))
}

async fn fork_step(
    State(app): State<Arc<App>>,
    Path((theme, step)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SaveCreatedResponse>), ApiError> {
    let theme = ThemeId::new(theme);
    let from = parse_step(&step)?;
    let step = app.use_cases.saves.manage.fork(&theme, from).await?;
    Ok((
        StatusCode::CREATED,
        Json(SaveCreatedResponse {
            theme: theme.into_inner(),
            step: step.to_string(),
        }),
    ))
}

async fn delete_step(
    State(app): State<Arc<App>>,
    Path((theme, step)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let step = parse_step(&step)?;
    app.use_cases
        .saves
        .manage
        .delete_step(&ThemeId::new(theme), step)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_saves(
    State(app): State<Arc<App>>,
    Path(theme): Path<String>,
) -> Result<StatusCode, ApiError> {
    app.use_cases
        .saves
        .manage
        .delete_theme(&ThemeId::new(theme))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_step(value: &str) -> Result<SaveStep, ApiError> {
    value
        .parse()
        .map_err(|e: storyloom_domain::DomainError| ApiError::BadRequest(e.to_string()))
}

// =============================================================================
// Failure escalation
// =============================================================================

async fn escalation_status(State(app): State<Arc<App>>) -> Json<EscalationStatusResponse> {
    Json(status_response(app.escalation.status().await))
}

async fn confirm_escalation(
    State(app): State<Arc<App>>,
    Json(body): Json<ConfirmEscalationRequest>,
) -> Json<EscalationStatusResponse> {
    if app.escalation.resolve(body.continue_calls).await.is_none() {
        tracing::debug!("Escalation confirmation received with nothing pending");
    }
    Json(status_response(app.escalation.status().await))
}

fn status_response(status: EscalationStatus) -> EscalationStatusResponse {
    EscalationStatusResponse {
        consecutive_failures: status.consecutive_failures,
        threshold: status.threshold,
        awaiting_confirmation: status.pending.is_some(),
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// Request was well-formed but cannot be played as is.
    Validation(String),
    Conflict(String),
    Escalation(EscalationError),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(ErrorCode::NotFound, msg)),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(ErrorCode::BadRequest, msg),
            ),
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(ErrorCode::ValidationError, msg),
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new(ErrorCode::BadRequest, msg),
            ),
            ApiError::Escalation(e) => {
                let code = match &e {
                    EscalationError::ConfirmationRequired { .. } => ErrorCode::EscalationRequired,
                    EscalationError::Declined { .. } => ErrorCode::EscalationDeclined,
                };
                let failures = match &e {
                    EscalationError::ConfirmationRequired { failures, .. }
                    | EscalationError::Declined { failures, .. } => *failures,
                };
                (
                    StatusCode::PRECONDITION_REQUIRED,
                    ErrorResponse::new(code, e.to_string())
                        .with_details(serde_json::json!({ "consecutive_failures": failures })),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(ErrorCode::InternalError, "Internal error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            RepoError::ConstraintViolation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SaveError> for ApiError {
    fn from(e: SaveError) -> Self {
        match e {
            SaveError::ThemeNotFound(_) | SaveError::StepNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            SaveError::AlreadyInitialized(_) => ApiError::Conflict(e.to_string()),
            SaveError::Graph(_) => ApiError::Internal(e.to_string()),
            SaveError::Repo(repo) => repo.into(),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyInstruction
            | TurnError::MissingScene { .. }
            | TurnError::MissingRequiredCharacters { .. } => ApiError::Validation(e.to_string()),
            TurnError::ThemeNotFound(_) | TurnError::StepNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            TurnError::Escalation(escalation) => ApiError::Escalation(escalation),
            TurnError::Save(save) => save.into(),
            TurnError::Repo(repo) => repo.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::app::AppPorts;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::failure_escalation::{EscalatingLlm, FailureEscalation};
    use crate::infrastructure::ports::{LlmError, LlmPort, MockCharacterCatalog, MockStoryGraphRepo};
    use crate::infrastructure::save_store::FsSaveStore;
    use crate::infrastructure::settings::EngineSettings;
    use crate::test_fixtures::{self, ScriptedLlm};

    struct TestServer {
        _dir: TempDir,
        router: Router,
    }

    fn server(oracle: ScriptedLlm) -> TestServer {
        let dir = TempDir::new().unwrap();
        let mut graphs = MockStoryGraphRepo::new();
        graphs.expect_load().returning(|theme| {
            if theme.as_str() == test_fixtures::THEME {
                Ok(test_fixtures::vault_graph())
            } else {
                Err(RepoError::not_found("StoryGraph", theme))
            }
        });
        graphs
            .expect_list_themes()
            .returning(|| Ok(vec![ThemeId::new(test_fixtures::THEME)]));
        let mut catalog = MockCharacterCatalog::new();
        catalog
            .expect_list_for_theme()
            .returning(|_| Ok(test_fixtures::crew()));

        let escalation = Arc::new(FailureEscalation::new(3));
        let llm: Arc<dyn LlmPort> = Arc::new(EscalatingLlm::new(Arc::new(oracle), escalation.clone()));
        let ports = AppPorts {
            graphs: Arc::new(graphs),
            catalog: Arc::new(catalog),
            saves: Arc::new(FsSaveStore::new(dir.path())),
            llm,
            clock: Arc::new(SystemClock::new()),
        };
        let app = Arc::new(App::new(ports, escalation, &EngineSettings::default()));
        TestServer {
            _dir: dir,
            router: routes().with_state(app),
        }
    }

    async fn send(server: &TestServer, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = server.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn execute_uri() -> String {
        format!("/api/themes/{}/execute", test_fixtures::THEME)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let server = server(ScriptedLlm::new());
        let response = server
            .router
            .clone()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn execute_plays_a_turn() {
        let oracle = ScriptedLlm::new().director(Ok(test_fixtures::director_reply_to(
            "room_001_001",
            "room",
        )));
        let server = server(oracle);

        let (status, body) = send(
            &server,
            Method::POST,
            &execute_uri(),
            Some(serde_json::json!({"instruction": "we head into the vault"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["new_step"], "1_step");
        assert_eq!(body["surface"]["responses"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["surface"]["environment_status"]["location"]["specific_location"],
            "Vault"
        );
        assert!(body["hidden"]["raw_responses"].is_array());
    }

    #[tokio::test]
    async fn empty_instruction_is_a_validation_error() {
        let server = server(ScriptedLlm::new());
        let (status, body) = send(
            &server,
            Method::POST,
            &execute_uri(),
            Some(serde_json::json!({"instruction": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_and_unknown_steps_are_distinguished() {
        let server = server(ScriptedLlm::new());
        let (status, _) = send(
            &server,
            Method::POST,
            &execute_uri(),
            Some(serde_json::json!({"instruction": "look", "save_step": "latest"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(
            &server,
            Method::POST,
            &format!("/api/themes/{}/saves", test_fixtures::THEME),
            None,
        )
        .await;
        let (status, body) = send(
            &server,
            Method::POST,
            &execute_uri(),
            Some(serde_json::json!({"instruction": "look", "save_step": "7_step"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_theme_is_not_found() {
        let server = server(ScriptedLlm::new());
        let (status, _) = send(
            &server,
            Method::POST,
            "/api/themes/haunted_manor/execute",
            Some(serde_json::json!({"instruction": "look"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn repeated_oracle_failures_require_confirmation() {
        let oracle = ScriptedLlm::new()
            .worker("Mira", Err(LlmError::RequestFailed("timeout".into())))
            .worker("Oskar", Err(LlmError::RequestFailed("timeout".into())))
            .director(Err(LlmError::RequestFailed("timeout".into())));
        let server = server(oracle);

        let (status, body) = send(
            &server,
            Method::POST,
            &execute_uri(),
            Some(serde_json::json!({"instruction": "open the vault"})),
        )
        .await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(body["code"], "ESCALATION_REQUIRED");
        assert_eq!(body["details"]["consecutive_failures"], 3);

        let (_, status_body) = send(&server, Method::GET, "/api/escalation", None).await;
        assert_eq!(status_body["awaiting_confirmation"], true);

        // Calls stay blocked until someone answers
        let (status, _) = send(
            &server,
            Method::POST,
            &execute_uri(),
            Some(serde_json::json!({"instruction": "try again"})),
        )
        .await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);

        let (status, body) = send(
            &server,
            Method::POST,
            "/api/escalation/confirm",
            Some(serde_json::json!({"continue_calls": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["awaiting_confirmation"], false);
        assert_eq!(body["consecutive_failures"], 0);
    }

    #[tokio::test]
    async fn save_line_lifecycle() {
        let server = server(ScriptedLlm::new());
        let saves_uri = format!("/api/themes/{}/saves", test_fixtures::THEME);

        let (status, body) = send(&server, Method::POST, &saves_uri, None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["step"], "0_step");

        let (status, _) = send(&server, Method::POST, &saves_uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&server, Method::POST, &format!("{saves_uri}/0_step/fork"), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["step"], "1_step");

        let (_, body) = send(&server, Method::GET, &saves_uri, None).await;
        let steps: Vec<&str> = body["steps"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["step"].as_str().unwrap())
            .collect();
        assert_eq!(steps, vec!["0_step", "1_step"]);

        let (status, _) = send(&server, Method::DELETE, &format!("{saves_uri}/1_step"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&server, Method::DELETE, &format!("{saves_uri}/1_step"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&server, Method::DELETE, &saves_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn lists_themes() {
        let server = server(ScriptedLlm::new());
        let (status, body) = send(&server, Method::GET, "/api/themes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([test_fixtures::THEME]));
    }
}
