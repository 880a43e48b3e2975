//! Engine configuration from environment variables.
//!
//! `.env` is loaded by `main` before this runs. Missing variables use the
//! defaults below; unparsable ones do too, with a warning.

use std::path::PathBuf;
use std::str::FromStr;

use crate::infrastructure::failure_escalation::DEFAULT_ESCALATION_THRESHOLD;
use crate::infrastructure::ollama::{
    DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::infrastructure::resilient_llm::RetryConfig;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub themes_dir: PathBuf,
    pub save_dir: PathBuf,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub llm_timeout_secs: u64,
    pub retry: RetryConfig,
    pub escalation_threshold: u32,
    /// Past turns handed to character workers as context.
    pub history_limit: usize,
    /// Elapsed game minutes when the Director gives no usable estimate.
    pub default_elapsed_minutes: f64,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            themes_dir: PathBuf::from("themes"),
            save_dir: PathBuf::from("saves"),
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            llm_timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryConfig::default(),
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            history_limit: 5,
            default_elapsed_minutes: storyloom_domain::DEFAULT_ELAPSED_MINUTES,
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let retry_defaults = RetryConfig::default();

        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            themes_dir: lookup("THEMES_DIR").map(PathBuf::from).unwrap_or(defaults.themes_dir),
            save_dir: lookup("SAVE_DIR").map(PathBuf::from).unwrap_or(defaults.save_dir),
            ollama_base_url: lookup("OLLAMA_URL")
                .or_else(|| lookup("OLLAMA_BASE_URL"))
                .unwrap_or(defaults.ollama_base_url),
            ollama_model: string("OLLAMA_MODEL", defaults.ollama_model),
            llm_timeout_secs: parsed(&lookup, "LLM_TIMEOUT_SECS", defaults.llm_timeout_secs),
            retry: RetryConfig {
                max_retries: parsed(&lookup, "LLM_MAX_RETRIES", retry_defaults.max_retries),
                base_delay_ms: parsed(&lookup, "LLM_BASE_DELAY_MS", retry_defaults.base_delay_ms),
                max_delay_ms: parsed(&lookup, "LLM_MAX_DELAY_MS", retry_defaults.max_delay_ms),
                jitter_factor: retry_defaults.jitter_factor,
            },
            escalation_threshold: parsed(
                &lookup,
                "ESCALATION_THRESHOLD",
                defaults.escalation_threshold,
            ),
            history_limit: parsed(&lookup, "HISTORY_LIMIT", defaults.history_limit),
            default_elapsed_minutes: parsed(
                &lookup,
                "DEFAULT_ELAPSED_MINUTES",
                defaults.default_elapsed_minutes,
            ),
            server_host: string("SERVER_HOST", defaults.server_host),
            server_port: lookup("SERVER_PORT")
                .or_else(|| lookup("PORT"))
                .map(|raw| parse_or("SERVER_PORT", &raw, defaults.server_port))
                .unwrap_or(defaults.server_port),
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    lookup(key)
        .map(|raw| parse_or(key, &raw, default))
        .unwrap_or(default)
}

fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = raw, "Unparsable setting, using default");
        default
    })
}
