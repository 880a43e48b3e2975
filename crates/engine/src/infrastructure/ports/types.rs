//! Records exchanged with the save store.

use storyloom_domain::{
    CharacterRecord, CharacterId, ConversationHistory, GameTime, SaveStep, SceneState,
};

/// Complete world state of one save snapshot as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub step: SaveStep,
    /// `None` when the snapshot directory exists but was never initialized.
    pub scene_state: Option<SceneState>,
    pub game_time: GameTime,
    /// Sorted by id.
    pub characters: Vec<CharacterRecord>,
    pub history: ConversationHistory,
}

impl Snapshot {
    pub fn character(&self, id: &CharacterId) -> Option<&CharacterRecord> {
        self.characters.iter().find(|c| &c.id == id)
    }
}

/// Everything written into a snapshot: the seed of `0_step`, or the state a
/// turn leaves behind in its fork.
///
/// Characters listed here overwrite their files; characters of the source
/// snapshot that are not listed are carried over untouched by the copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotContents {
    pub scene_state: SceneState,
    pub game_time: GameTime,
    pub characters: Vec<CharacterRecord>,
    pub history: ConversationHistory,
}
