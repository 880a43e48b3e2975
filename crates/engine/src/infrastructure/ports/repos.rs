//! Storage port traits: save lines, story graphs and the character catalog.

use async_trait::async_trait;
use storyloom_domain::{CharacterRecord, SaveStep, StoryGraph, ThemeId};

use super::error::RepoError;
use super::types::{Snapshot, SnapshotContents};

// =============================================================================
// Save Versioner
// =============================================================================

/// Versioned save snapshots, one directory per `<n>_step`.
///
/// A snapshot is never modified once written. New state only ever appears as
/// a new snapshot forked from an existing one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SaveStore: Send + Sync {
    /// Steps of the theme's save line in numeric order.
    async fn list_steps(&self, theme: &ThemeId) -> Result<Vec<SaveStep>, RepoError>;

    async fn load_snapshot(&self, theme: &ThemeId, step: SaveStep) -> Result<Snapshot, RepoError>;

    /// Write `0_step`. Fails if the save line already has one.
    async fn initialize(
        &self,
        theme: &ThemeId,
        contents: SnapshotContents,
    ) -> Result<SaveStep, RepoError>;

    /// Copy `from` into the next free step and return its name.
    async fn fork(&self, theme: &ThemeId, from: SaveStep) -> Result<SaveStep, RepoError>;

    /// Fork `from` and write `contents` into the fork before publishing it.
    ///
    /// Either the new step appears complete or no new step appears at all.
    async fn commit_turn(
        &self,
        theme: &ThemeId,
        from: SaveStep,
        contents: SnapshotContents,
    ) -> Result<SaveStep, RepoError>;

    async fn delete_step(&self, theme: &ThemeId, step: SaveStep) -> Result<(), RepoError>;

    async fn delete_theme(&self, theme: &ThemeId) -> Result<(), RepoError>;

    /// Total bytes of the snapshot's files.
    async fn step_size(&self, theme: &ThemeId, step: SaveStep) -> Result<u64, RepoError>;
}

// =============================================================================
// Authored content
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoryGraphRepo: Send + Sync {
    async fn load(&self, theme: &ThemeId) -> Result<StoryGraph, RepoError>;
    async fn list_themes(&self) -> Result<Vec<ThemeId>, RepoError>;
}

/// Character sheets authored for a theme, before any save line exists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterCatalog: Send + Sync {
    async fn list_for_theme(&self, theme: &ThemeId) -> Result<Vec<CharacterRecord>, RepoError>;
}
