//! Storyloom Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyloom_engine::api;
use storyloom_engine::app::{App, AppPorts};
use storyloom_engine::infrastructure::{
    failure_escalation::{EscalatingLlm, FailureEscalation},
    ollama::OllamaClient,
    ports::LlmPort,
    resilient_llm::ResilientLlmClient,
    settings::EngineSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyloom_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Storyloom Engine");

    let settings = EngineSettings::from_env();
    tracing::info!(
        themes_dir = %settings.themes_dir.display(),
        save_dir = %settings.save_dir.display(),
        model = %settings.ollama_model,
        "Configuration loaded"
    );

    // Oracle: HTTP client, retries, then failure escalation around the whole retry sequence
    let ollama_client = Arc::new(OllamaClient::with_timeout(
        &settings.ollama_base_url,
        &settings.ollama_model,
        settings.llm_timeout_secs,
    ));
    tracing::info!(
        "LLM client configured with retry: max_retries={}, base_delay_ms={}",
        settings.retry.max_retries,
        settings.retry.base_delay_ms
    );
    let resilient = Arc::new(ResilientLlmClient::new(ollama_client, settings.retry.clone()));
    let escalation = Arc::new(FailureEscalation::new(settings.escalation_threshold));
    let llm: Arc<dyn LlmPort> = Arc::new(EscalatingLlm::new(resilient, escalation.clone()));

    // Create application
    let app = Arc::new(App::new(
        AppPorts::filesystem(&settings, llm),
        escalation,
        &settings,
    ));

    let mut router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer_from_env() {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server_host, settings.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
    let _ = dotenvy::dotenv();
}

fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
