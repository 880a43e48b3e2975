//! Inspect, fork and prune a save line.

use std::sync::Arc;

use storyloom_domain::{SaveStep, ThemeId};

use super::SaveError;
use crate::infrastructure::ports::{RepoError, SaveStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
    pub step: SaveStep,
    pub size_bytes: u64,
}

pub struct ManageSaves {
    saves: Arc<dyn SaveStore>,
}

impl ManageSaves {
    pub fn new(saves: Arc<dyn SaveStore>) -> Self {
        Self { saves }
    }

    /// Snapshots of the save line in numeric order, with their sizes.
    pub async fn list(&self, theme: &ThemeId) -> Result<Vec<StepInfo>, SaveError> {
        let steps = self.saves.list_steps(theme).await?;
        let mut infos = Vec::with_capacity(steps.len());
        for step in steps {
            let size_bytes = self.saves.step_size(theme, step).await?;
            infos.push(StepInfo { step, size_bytes });
        }
        Ok(infos)
    }

    /// Copy `from` into a new snapshot without playing a turn.
    pub async fn fork(&self, theme: &ThemeId, from: SaveStep) -> Result<SaveStep, SaveError> {
        self.saves
            .fork(theme, from)
            .await
            .map_err(|e| step_error(e, theme, from))
    }

    /// Remove one snapshot. The others keep their names.
    pub async fn delete_step(&self, theme: &ThemeId, step: SaveStep) -> Result<(), SaveError> {
        self.saves
            .delete_step(theme, step)
            .await
            .map_err(|e| step_error(e, theme, step))
    }

    pub async fn delete_theme(&self, theme: &ThemeId) -> Result<(), SaveError> {
        self.saves.delete_theme(theme).await.map_err(|e| {
            if e.is_not_found() {
                SaveError::ThemeNotFound(theme.clone())
            } else {
                SaveError::Repo(e)
            }
        })
    }
}

fn step_error(e: RepoError, theme: &ThemeId, step: SaveStep) -> SaveError {
    if e.is_not_found() {
        SaveError::StepNotFound {
            theme: theme.clone(),
            step,
        }
    } else {
        SaveError::Repo(e)
    }
}
