//! Turn use cases.
//!
//! One player instruction in, one new snapshot out:
//!
//! 1. Resolve the source snapshot and its location
//! 2. Pick the participating characters
//! 3. Fan out one Character Worker per participant, join all of them
//! 4. Ask the Director, validate its decision against the story graph
//! 5. Fold the ruling into the next snapshot's state and publish the fork
//! 6. Format the result for the player

use std::sync::Arc;

use storyloom_domain::{CharacterId, SaveStep, ThemeId};

use crate::infrastructure::ports::{EscalationError, RepoError};
use crate::use_cases::saves::SaveError;

mod aggregate;
mod apply;
mod format;
mod process;

pub use aggregate::{run_workers, TurnReactions};
pub use apply::{apply_turn, AppliedTurn, TurnDelta};
pub use format::{format_turn, StepTimings, TurnReport};
pub use process::ProcessInstruction;

/// Container for turn use cases.
pub struct TurnUseCases {
    pub process: Arc<ProcessInstruction>,
}

impl TurnUseCases {
    pub fn new(process: Arc<ProcessInstruction>) -> Self {
        Self { process }
    }
}

/// One player instruction against a save line.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub theme: ThemeId,
    pub instruction: String,
    /// Snapshot to play from. `None` plays from the newest one.
    pub from_step: Option<SaveStep>,
    /// Restrict the turn to these characters. `None` or empty means every
    /// character of the theme in the snapshot.
    pub character_ids: Option<Vec<CharacterId>>,
    /// Overrides the story graph's player role for this turn.
    pub player_role: Option<String>,
}

impl TurnRequest {
    pub fn new(theme: impl Into<ThemeId>, instruction: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            instruction: instruction.into(),
            from_step: None,
            character_ids: None,
            player_role: None,
        }
    }

    pub fn from_step(mut self, step: SaveStep) -> Self {
        self.from_step = Some(step);
        self
    }

    pub fn with_characters(mut self, ids: Vec<CharacterId>) -> Self {
        self.character_ids = Some(ids);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Instruction is empty")]
    EmptyInstruction,
    #[error("Theme not found: {0}")]
    ThemeNotFound(ThemeId),
    #[error("Snapshot {theme}/{step} not found")]
    StepNotFound { theme: ThemeId, step: SaveStep },
    #[error("Snapshot {theme}/{step} has no scene state")]
    MissingScene { theme: ThemeId, step: SaveStep },
    #[error("No participating characters in '{theme}', but the story requires {required:?}")]
    MissingRequiredCharacters {
        theme: ThemeId,
        required: Vec<CharacterId>,
    },
    #[error(transparent)]
    Escalation(#[from] EscalationError),
    #[error("Save error: {0}")]
    Save(#[from] SaveError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl TurnError {
    /// Errors the player can fix by changing the request.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            TurnError::EmptyInstruction
                | TurnError::ThemeNotFound(_)
                | TurnError::StepNotFound { .. }
                | TurnError::MissingScene { .. }
                | TurnError::MissingRequiredCharacters { .. }
        )
    }
}
