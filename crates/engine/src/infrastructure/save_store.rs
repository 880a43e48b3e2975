//! Filesystem save versioner.
//!
//! Layout, one directory per snapshot:
//!
//! ```text
//! <save_dir>/<theme>/<n>_step/
//!     SCENE_STATE.json      authoritative scene state
//!     SCENE_ID.txt          current scene pointer
//!     ROOM_ID.txt           current room pointer, absent at scene level
//!     GAME_TIME.json
//!     HISTORY.json
//!     characters/<id>.json
//! ```
//!
//! New snapshots are assembled in a hidden `.staging-<n>_step-<uuid>`
//! directory next to the published ones and renamed into place only once
//! complete, so a crash or error never leaves a half-written `<n>_step`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::future::{try_join_all, BoxFuture};
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use storyloom_domain::{
    CharacterRecord, ConversationHistory, GameTime, RoomId, SaveStep, SceneId, SceneState,
    ThemeId,
};
use tokio::fs;
use uuid::Uuid;

use crate::infrastructure::ports::{RepoError, SaveStore, Snapshot, SnapshotContents};

const SCENE_STATE_FILE: &str = "SCENE_STATE.json";
const SCENE_ID_FILE: &str = "SCENE_ID.txt";
const ROOM_ID_FILE: &str = "ROOM_ID.txt";
const GAME_TIME_FILE: &str = "GAME_TIME.json";
const HISTORY_FILE: &str = "HISTORY.json";
const CHARACTERS_DIR: &str = "characters";
const STAGING_PREFIX: &str = ".staging-";

pub struct FsSaveStore {
    root: PathBuf,
}

impl FsSaveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn theme_dir(&self, theme: &ThemeId) -> Result<PathBuf, RepoError> {
        Ok(self.root.join(path_segment("theme", theme.as_str())?))
    }

    fn step_dir(&self, theme: &ThemeId, step: SaveStep) -> Result<PathBuf, RepoError> {
        Ok(self.theme_dir(theme)?.join(step.to_string()))
    }

    /// Copy `from` (if any), write `contents` (if any), then publish as the next free step.
    async fn publish(
        &self,
        theme: &ThemeId,
        from: Option<SaveStep>,
        contents: Option<&SnapshotContents>,
    ) -> Result<SaveStep, RepoError> {
        let theme_dir = self.theme_dir(theme)?;
        let existing = self.list_steps(theme).await?;

        let target_step = match from {
            Some(from) => {
                if !existing.contains(&from) {
                    return Err(RepoError::not_found("SaveStep", format!("{theme}/{from}")));
                }
                SaveStep::next_free(from, &existing)
            }
            None => {
                if existing.contains(&SaveStep::INITIAL) {
                    return Err(RepoError::constraint(format!(
                        "save line '{theme}' is already initialized"
                    )));
                }
                SaveStep::INITIAL
            }
        };

        let target = theme_dir.join(target_step.to_string());
        let staging = theme_dir.join(format!("{STAGING_PREFIX}{target_step}-{}", Uuid::new_v4().simple()));

        let assembled = async {
            fs::create_dir_all(&theme_dir)
                .await
                .map_err(|e| RepoError::storage("create_theme_dir", e))?;
            match from {
                Some(from) => {
                    let source = theme_dir.join(from.to_string());
                    copy_dir(&source, &staging)
                        .await
                        .map_err(|e| RepoError::storage("copy_snapshot", e))?;
                }
                None => fs::create_dir(&staging)
                    .await
                    .map_err(|e| RepoError::storage("create_snapshot", e))?,
            }
            if let Some(contents) = contents {
                write_contents(&staging, contents).await?;
            }
            if fs::try_exists(&target)
                .await
                .map_err(|e| RepoError::storage("publish_snapshot", e))?
            {
                return Err(RepoError::constraint(format!(
                    "snapshot {theme}/{target_step} appeared while forking"
                )));
            }
            fs::rename(&staging, &target)
                .await
                .map_err(|e| RepoError::storage("publish_snapshot", e))
        }
        .await;

        if let Err(e) = assembled {
            tracing::error!(
                theme = %theme,
                step = %target_step,
                error = %e,
                "Snapshot fork failed, discarding staging directory"
            );
            if let Err(cleanup) = fs::remove_dir_all(&staging).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %staging.display(), error = %cleanup, "Could not remove staging directory");
                }
            }
            return Err(e);
        }

        tracing::info!(theme = %theme, from = ?from.map(|s| s.to_string()), step = %target_step, "Snapshot published");
        Ok(target_step)
    }
}

#[async_trait]
impl SaveStore for FsSaveStore {
    async fn list_steps(&self, theme: &ThemeId) -> Result<Vec<SaveStep>, RepoError> {
        let theme_dir = self.theme_dir(theme)?;
        let mut entries = match fs::read_dir(&theme_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepoError::storage("list_steps", e)),
        };

        let mut steps = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepoError::storage("list_steps", e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| RepoError::storage("list_steps", e))?
                .is_dir();
            if !is_dir {
                continue;
            }
            if let Some(step) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<SaveStep>().ok())
            {
                steps.push(step);
            }
        }
        steps.sort();
        Ok(steps)
    }

    async fn load_snapshot(&self, theme: &ThemeId, step: SaveStep) -> Result<Snapshot, RepoError> {
        let dir = self.step_dir(theme, step)?;
        if !fs::try_exists(&dir)
            .await
            .map_err(|e| RepoError::storage("load_snapshot", e))?
        {
            return Err(RepoError::not_found("SaveStep", format!("{theme}/{step}")));
        }

        let scene_state = match read_json_opt::<SceneState>(&dir.join(SCENE_STATE_FILE)).await? {
            Some(state) => Some(state),
            None => read_pointers(&dir).await?,
        };
        let game_time = read_json_opt::<GameTime>(&dir.join(GAME_TIME_FILE))
            .await?
            .unwrap_or_default();
        let history = read_json_opt::<ConversationHistory>(&dir.join(HISTORY_FILE))
            .await?
            .unwrap_or_default();
        let characters = read_characters(&dir.join(CHARACTERS_DIR)).await?;

        Ok(Snapshot {
            step,
            scene_state,
            game_time,
            characters,
            history,
        })
    }

    async fn initialize(
        &self,
        theme: &ThemeId,
        contents: SnapshotContents,
    ) -> Result<SaveStep, RepoError> {
        self.publish(theme, None, Some(&contents)).await
    }

    async fn fork(&self, theme: &ThemeId, from: SaveStep) -> Result<SaveStep, RepoError> {
        self.publish(theme, Some(from), None).await
    }

    async fn commit_turn(
        &self,
        theme: &ThemeId,
        from: SaveStep,
        contents: SnapshotContents,
    ) -> Result<SaveStep, RepoError> {
        self.publish(theme, Some(from), Some(&contents)).await
    }

    async fn delete_step(&self, theme: &ThemeId, step: SaveStep) -> Result<(), RepoError> {
        let dir = self.step_dir(theme, step)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::info!(theme = %theme, step = %step, "Snapshot deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RepoError::not_found("SaveStep", format!("{theme}/{step}")))
            }
            Err(e) => Err(RepoError::storage("delete_step", e)),
        }
    }

    async fn delete_theme(&self, theme: &ThemeId) -> Result<(), RepoError> {
        let dir = self.theme_dir(theme)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::info!(theme = %theme, "Save line deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RepoError::not_found("SaveLine", theme))
            }
            Err(e) => Err(RepoError::storage("delete_theme", e)),
        }
    }

    async fn step_size(&self, theme: &ThemeId, step: SaveStep) -> Result<u64, RepoError> {
        let dir = self.step_dir(theme, step)?;
        match dir_size(&dir).await {
            Ok(size) => Ok(size),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RepoError::not_found("SaveStep", format!("{theme}/{step}")))
            }
            Err(e) => Err(RepoError::storage("step_size", e)),
        }
    }
}

// =============================================================================
// File helpers
// =============================================================================

/// Reject names that would escape the save root when joined as a path.
fn path_segment<'a>(kind: &'static str, name: &'a str) -> Result<&'a str, RepoError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(RepoError::constraint(format!("invalid {kind} name '{name}'")));
    }
    Ok(name)
}

fn copy_dir<'a>(source: &'a Path, target: &'a Path) -> BoxFuture<'a, std::io::Result<()>> {
    async move {
        fs::create_dir(target).await?;
        let mut entries = fs::read_dir(source).await?;
        while let Some(entry) = entries.next_entry().await? {
            let from = entry.path();
            let to = target.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                copy_dir(&from, &to).await?;
            } else {
                fs::copy(&from, &to).await?;
            }
        }
        Ok(())
    }
    .boxed()
}

fn dir_size(dir: &Path) -> BoxFuture<'_, std::io::Result<u64>> {
    async move {
        let mut total = 0;
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            total += if metadata.is_dir() {
                dir_size(&entry.path()).await?
            } else {
                metadata.len()
            };
        }
        Ok(total)
    }
    .boxed()
}

async fn write_contents(dir: &Path, contents: &SnapshotContents) -> Result<(), RepoError> {
    let characters_dir = dir.join(CHARACTERS_DIR);
    fs::create_dir_all(&characters_dir)
        .await
        .map_err(|e| RepoError::storage("write_characters", e))?;
    for character in &contents.characters {
        let stem = path_segment("character", character.id.as_str())?;
        write_json(&characters_dir.join(format!("{stem}.json")), character).await?;
    }

    let state = &contents.scene_state;
    write_json(&dir.join(SCENE_STATE_FILE), state).await?;
    write_text(&dir.join(SCENE_ID_FILE), state.current_scene_id.as_str()).await?;
    let room_pointer = dir.join(ROOM_ID_FILE);
    match &state.current_room_id {
        Some(room) => write_text(&room_pointer, room.as_str()).await?,
        None => match fs::remove_file(&room_pointer).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RepoError::storage("write_room_pointer", e)),
        },
    }

    write_json(&dir.join(GAME_TIME_FILE), &contents.game_time).await?;
    write_json(&dir.join(HISTORY_FILE), &contents.history).await?;
    Ok(())
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RepoError> {
    let json = serde_json::to_vec_pretty(value).map_err(RepoError::serialization)?;
    fs::write(path, json)
        .await
        .map_err(|e| RepoError::storage("write_file", e))
}

async fn write_text(path: &Path, value: &str) -> Result<(), RepoError> {
    fs::write(path, value)
        .await
        .map_err(|e| RepoError::storage("write_file", e))
}

async fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, RepoError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RepoError::serialization(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RepoError::storage("read_file", e)),
    }
}

async fn read_text_opt(path: &Path) -> Result<Option<String>, RepoError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(storyloom_domain::common::none_if_blank(&text).map(str::to_string)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RepoError::storage("read_file", e)),
    }
}

/// Snapshots written with only the id pointers still describe a location.
async fn read_pointers(dir: &Path) -> Result<Option<SceneState>, RepoError> {
    let Some(scene) = read_text_opt(&dir.join(SCENE_ID_FILE)).await? else {
        return Ok(None);
    };
    let room = read_text_opt(&dir.join(ROOM_ID_FILE)).await?;
    let location = match room {
        Some(room) => storyloom_domain::Location::AtRoom {
            scene: SceneId::new(scene),
            room: RoomId::new(room),
        },
        None => storyloom_domain::Location::AtScene {
            scene: SceneId::new(scene),
        },
    };
    Ok(Some(SceneState::new(location, &GameTime::start())))
}

async fn read_characters(dir: &Path) -> Result<Vec<CharacterRecord>, RepoError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RepoError::storage("read_characters", e)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RepoError::storage("read_characters", e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }

    let loaded = try_join_all(paths.iter().map(|path| read_json_opt::<CharacterRecord>(path))).await?;
    let mut characters: Vec<CharacterRecord> = loaded.into_iter().flatten().collect();
    characters.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(characters)
}
