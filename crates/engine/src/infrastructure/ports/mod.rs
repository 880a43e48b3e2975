//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Save snapshots and authored content (could swap filesystem -> object store)
//! - The Oracle (could swap Ollama -> any OpenAI-compatible endpoint)
//! - Human confirmation after repeated Oracle failures
//! - Wall clock (fixed in tests)

mod error;
mod external;
mod repos;
mod types;

// =============================================================================
// Storage Ports
// =============================================================================
pub use repos::{CharacterCatalog, SaveStore, StoryGraphRepo};
pub use types::{Snapshot, SnapshotContents};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    ChatMessage, ClockPort, ConfirmationPort, LlmPort, LlmRequest, LlmResponse, MessageRole,
};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::{MockConfirmationPort, MockLlmPort};
#[cfg(test)]
pub use repos::{MockCharacterCatalog, MockSaveStore, MockStoryGraphRepo};

// =============================================================================
// Error Types
// =============================================================================
pub use error::{EscalationError, LlmError, RepoError};
