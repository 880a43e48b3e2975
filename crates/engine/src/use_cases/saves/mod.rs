//! Save-line use cases.
//!
//! A save line is the ordered set of `<n>_step` snapshots of one theme.
//! Turns add to it (see `use_cases::turn`); these use cases create, inspect,
//! fork and prune it.

use std::sync::Arc;

use storyloom_domain::{DomainError, SaveStep, ThemeId};

use crate::infrastructure::ports::RepoError;

mod initialize;
mod manage;

pub use initialize::InitializeSave;
pub use manage::{ManageSaves, StepInfo};

/// Container for save-line use cases.
pub struct SaveUseCases {
    pub initialize: Arc<InitializeSave>,
    pub manage: Arc<ManageSaves>,
}

impl SaveUseCases {
    pub fn new(initialize: Arc<InitializeSave>, manage: Arc<ManageSaves>) -> Self {
        Self { initialize, manage }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Theme not found: {0}")]
    ThemeNotFound(ThemeId),
    #[error("Save line '{0}' is already initialized")]
    AlreadyInitialized(ThemeId),
    #[error("Snapshot {theme}/{step} not found")]
    StepNotFound { theme: ThemeId, step: SaveStep },
    #[error("Invalid story graph: {0}")]
    Graph(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
