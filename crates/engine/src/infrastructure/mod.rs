//! Port implementations and process-wide plumbing: filesystem stores, the
//! Ollama client and its wrappers, settings.

pub mod clock;
pub mod failure_escalation;
pub mod ollama;
pub mod ports;
pub mod resilient_llm;
pub mod save_store;
pub mod settings;
pub mod theme_store;
pub mod turn_id;
