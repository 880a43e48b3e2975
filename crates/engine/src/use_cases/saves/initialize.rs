//! Create `0_step` of a theme's save line.

use std::sync::Arc;

use storyloom_domain::{ConversationHistory, GameTime, Location, SaveStep, SceneState, ThemeId};

use super::SaveError;
use crate::infrastructure::ports::{
    CharacterCatalog, RepoError, SaveStore, SnapshotContents, StoryGraphRepo,
};

/// Seed a save line from the story graph's starting scene and the theme's
/// character catalog.
pub struct InitializeSave {
    graphs: Arc<dyn StoryGraphRepo>,
    catalog: Arc<dyn CharacterCatalog>,
    saves: Arc<dyn SaveStore>,
}

impl InitializeSave {
    pub fn new(
        graphs: Arc<dyn StoryGraphRepo>,
        catalog: Arc<dyn CharacterCatalog>,
        saves: Arc<dyn SaveStore>,
    ) -> Self {
        Self {
            graphs,
            catalog,
            saves,
        }
    }

    pub async fn execute(&self, theme: &ThemeId) -> Result<SaveStep, SaveError> {
        // 1. The starting scene comes from the story graph
        let graph = self.graphs.load(theme).await.map_err(|e| {
            if e.is_not_found() {
                SaveError::ThemeNotFound(theme.clone())
            } else {
                SaveError::Repo(e)
            }
        })?;
        let start = graph.starting_scene()?;

        // 2. Every catalog character tagged with the theme joins the save line
        let characters = self.catalog.list_for_theme(theme).await?;
        let missing: Vec<&str> = graph
            .required_characters
            .iter()
            .filter(|required| !characters.iter().any(|c| &c.id == *required))
            .map(|id| id.as_str())
            .collect();
        if !missing.is_empty() {
            tracing::warn!(theme = %theme, missing = ?missing, "Required characters are not in the catalog");
        }

        // 3. Day 1 12:00, at the starting scene, nothing fired yet
        let time = GameTime::start();
        let contents = SnapshotContents {
            scene_state: SceneState::new(
                Location::AtScene {
                    scene: start.id.clone(),
                },
                &time,
            ),
            game_time: time,
            characters,
            history: ConversationHistory::new(),
        };

        let step = self.saves.initialize(theme, contents).await.map_err(|e| match e {
            RepoError::ConstraintViolation(_) => SaveError::AlreadyInitialized(theme.clone()),
            other => SaveError::Repo(other),
        })?;

        tracing::info!(theme = %theme, scene = %start.id, step = %step, "Save line initialized");
        Ok(step)
    }
}
