//! Authored theme content on disk.
//!
//! ```text
//! <themes_dir>/<theme>/story_graph.json
//! <themes_dir>/<theme>/characters/<id>.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use storyloom_domain::{CharacterRecord, StoryGraph, ThemeId};
use tokio::fs;

use crate::infrastructure::ports::{CharacterCatalog, RepoError, StoryGraphRepo};

const STORY_GRAPH_FILE: &str = "story_graph.json";
const CHARACTERS_DIR: &str = "characters";

pub struct FsThemeStore {
    root: PathBuf,
}

impl FsThemeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn theme_dir(&self, theme: &ThemeId) -> Result<PathBuf, RepoError> {
        let name = theme.as_str();
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
            return Err(RepoError::constraint(format!("invalid theme name '{name}'")));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl StoryGraphRepo for FsThemeStore {
    async fn load(&self, theme: &ThemeId) -> Result<StoryGraph, RepoError> {
        let path = self.theme_dir(theme)?.join(STORY_GRAPH_FILE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepoError::not_found("StoryGraph", theme));
            }
            Err(e) => return Err(RepoError::storage("load_story_graph", e)),
        };

        let mut graph: StoryGraph = serde_json::from_slice(&bytes)
            .map_err(|e| RepoError::serialization(format!("{}: {e}", path.display())))?;
        if &graph.theme != theme {
            tracing::warn!(
                theme = %theme,
                declared = %graph.theme,
                "Story graph declares a different theme, using the directory name"
            );
            graph.theme = theme.clone();
        }
        graph
            .validate()
            .map_err(|e| RepoError::constraint(format!("story graph '{theme}': {e}")))?;

        tracing::debug!(theme = %theme, scenes = graph.scenes.len(), "Story graph loaded");
        Ok(graph)
    }

    async fn list_themes(&self) -> Result<Vec<ThemeId>, RepoError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepoError::storage("list_themes", e)),
        };

        let mut themes = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepoError::storage("list_themes", e))?
        {
            let has_graph = fs::try_exists(entry.path().join(STORY_GRAPH_FILE))
                .await
                .map_err(|e| RepoError::storage("list_themes", e))?;
            if !has_graph {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                themes.push(ThemeId::new(name));
            }
        }
        themes.sort();
        Ok(themes)
    }
}

#[async_trait]
impl CharacterCatalog for FsThemeStore {
    async fn list_for_theme(&self, theme: &ThemeId) -> Result<Vec<CharacterRecord>, RepoError> {
        let dir = self.theme_dir(theme)?.join(CHARACTERS_DIR);
        let mut characters = Vec::new();
        for path in json_files(&dir).await? {
            let bytes = fs::read(&path)
                .await
                .map_err(|e| RepoError::storage("load_character", e))?;
            let mut record: CharacterRecord = serde_json::from_slice(&bytes)
                .map_err(|e| RepoError::serialization(format!("{}: {e}", path.display())))?;

            match &record.theme {
                None => record.theme = Some(theme.clone()),
                Some(tagged) if tagged != theme => {
                    tracing::debug!(
                        character = %record.id,
                        tagged = %tagged,
                        theme = %theme,
                        "Skipping character tagged with another theme"
                    );
                    continue;
                }
                Some(_) => {}
            }
            characters.push(record);
        }
        characters.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(characters)
    }
}

async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, RepoError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RepoError::storage("list_characters", e)),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RepoError::storage("list_characters", e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use tempfile::TempDir;

    fn write_theme(root: &Path) {
        let theme_dir = root.join(test_fixtures::THEME);
        std::fs::create_dir_all(theme_dir.join(CHARACTERS_DIR)).unwrap();
        std::fs::write(
            theme_dir.join(STORY_GRAPH_FILE),
            serde_json::to_vec(&test_fixtures::vault_graph()).unwrap(),
        )
        .unwrap();
        for character in test_fixtures::crew() {
            std::fs::write(
                theme_dir
                    .join(CHARACTERS_DIR)
                    .join(format!("{}.json", character.id)),
                serde_json::to_vec(&character).unwrap(),
            )
            .unwrap();
        }
        let stranger = CharacterRecord::new("char_099", "Stranger").with_theme("haunted_manor");
        std::fs::write(
            theme_dir.join(CHARACTERS_DIR).join("char_099.json"),
            serde_json::to_vec(&stranger).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn loads_graph_and_lists_themes() {
        let dir = TempDir::new().unwrap();
        write_theme(dir.path());
        std::fs::create_dir_all(dir.path().join("empty_dir")).unwrap();
        let store = FsThemeStore::new(dir.path());

        let theme = ThemeId::new(test_fixtures::THEME);
        let graph = store.load(&theme).await.unwrap();
        assert_eq!(graph.theme, theme);
        assert_eq!(store.list_themes().await.unwrap(), vec![theme]);
    }

    #[tokio::test]
    async fn catalog_skips_characters_of_other_themes() {
        let dir = TempDir::new().unwrap();
        write_theme(dir.path());
        let store = FsThemeStore::new(dir.path());

        let characters = store
            .list_for_theme(&ThemeId::new(test_fixtures::THEME))
            .await
            .unwrap();
        let ids: Vec<&str> = characters.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["char_001", "char_002"]);
        assert!(characters
            .iter()
            .all(|c| c.belongs_to(&ThemeId::new(test_fixtures::THEME))));
    }

    #[tokio::test]
    async fn unknown_theme_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FsThemeStore::new(dir.path());
        let err = store.load(&ThemeId::new("nowhere")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn dangling_connections_are_rejected() {
        let dir = TempDir::new().unwrap();
        let theme_dir = dir.path().join("broken");
        std::fs::create_dir_all(&theme_dir).unwrap();
        std::fs::write(
            theme_dir.join(STORY_GRAPH_FILE),
            r#"{"theme":"broken","scenes":[{"id":"s1","name":"Start","connections":[{"target":"s9","type":"scene"}]}]}"#,
        )
        .unwrap();

        let store = FsThemeStore::new(dir.path());
        let err = store.load(&ThemeId::new("broken")).await.unwrap_err();
        assert!(matches!(err, RepoError::ConstraintViolation(_)));
    }
}
