//! Process one player instruction into a new snapshot.

use std::sync::Arc;
use std::time::Instant;

use storyloom_domain::{CharacterRecord, SaveStep, SceneState, StoryGraph, ThemeId};
use storyloom_shared::TurnResponse;
use tracing::Instrument;

use super::aggregate::run_workers;
use super::apply::{apply_turn, TurnDelta};
use super::format::{format_turn, StepTimings, TurnReport};
use super::{TurnError, TurnRequest};
use crate::infrastructure::ports::{ClockPort, SaveStore, Snapshot, StoryGraphRepo};
use crate::infrastructure::turn_id::TurnId;
use crate::use_cases::agents::{CharacterWorker, SceneBriefing};
use crate::use_cases::director::{
    validate_decision, Director, DirectorBrief, ValidationContext,
};
use crate::use_cases::saves::InitializeSave;

/// The turn coordinator.
///
/// Nothing is written until every worker and the Director have answered. A
/// turn either publishes exactly one new snapshot or leaves the save line as
/// it was.
pub struct ProcessInstruction {
    graphs: Arc<dyn StoryGraphRepo>,
    saves: Arc<dyn SaveStore>,
    initialize: Arc<InitializeSave>,
    worker: Arc<CharacterWorker>,
    director: Arc<Director>,
    clock: Arc<dyn ClockPort>,
    history_limit: usize,
    default_elapsed_minutes: f64,
}

impl ProcessInstruction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graphs: Arc<dyn StoryGraphRepo>,
        saves: Arc<dyn SaveStore>,
        initialize: Arc<InitializeSave>,
        worker: Arc<CharacterWorker>,
        director: Arc<Director>,
        clock: Arc<dyn ClockPort>,
        history_limit: usize,
        default_elapsed_minutes: f64,
    ) -> Self {
        Self {
            graphs,
            saves,
            initialize,
            worker,
            director,
            clock,
            history_limit,
            default_elapsed_minutes,
        }
    }

    pub async fn execute(&self, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        let turn_id = TurnId::generate();
        let span = tracing::info_span!(
            "turn",
            turn_id = %turn_id.short(),
            theme = %request.theme,
        );

        async {
            let theme = request.theme.clone();
            let from = request.from_step;
            let result = self.run(&turn_id, request).await;
            match &result {
                Ok(response) => {
                    tracing::info!(new_step = %response.new_step, "Turn completed");
                }
                Err(e) if e.is_user_actionable() => {
                    tracing::warn!(error = %e, from_step = ?from, "Turn rejected");
                }
                Err(e) => {
                    tracing::error!(theme = %theme, from_step = ?from, error = %e, "Turn failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, turn_id: &TurnId, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        if request.instruction.trim().is_empty() {
            return Err(TurnError::EmptyInstruction);
        }
        let theme = &request.theme;
        let mut timings = StepTimings::default();

        // 1. Source snapshot and its location
        let started = Instant::now();
        let graph = self.load_graph(theme).await?;
        let from = self.resolve_step(theme, request.from_step).await?;
        let snapshot = self.saves.load_snapshot(theme, from).await.map_err(|e| {
            if e.is_not_found() {
                TurnError::StepNotFound {
                    theme: theme.clone(),
                    step: from,
                }
            } else {
                TurnError::Repo(e)
            }
        })?;
        let scene_state = snapshot.scene_state.clone().ok_or_else(|| TurnError::MissingScene {
            theme: theme.clone(),
            step: from,
        })?;

        // 2. Participants
        let participants = select_participants(&snapshot, &request);
        if participants.is_empty() && graph.requires_characters() {
            return Err(TurnError::MissingRequiredCharacters {
                theme: theme.clone(),
                required: graph.required_characters.clone(),
            });
        }
        timings.record("load", started.elapsed());
        tracing::debug!(
            from_step = %from,
            location = %scene_state.location(),
            participants = participants.len(),
            "Turn context resolved"
        );

        // 3. Fan out the workers and wait for every one of them
        let started = Instant::now();
        let briefing = Arc::new(self.briefing(&graph, &snapshot, &scene_state, &request));
        let reactions = run_workers(&self.worker, &participants, &briefing).await?;
        timings.record("workers", started.elapsed());
        if reactions.degraded_count() > 0 {
            tracing::warn!(
                degraded = reactions.degraded_count(),
                total = reactions.len(),
                "Some characters answered with a degraded response"
            );
        }

        // 4. Director, then graph validation
        let started = Instant::now();
        let actors = reactions.actors(&participants);
        let decision = self
            .director
            .decide(&DirectorBrief {
                graph: &graph,
                scene_state: &scene_state,
                game_time: &snapshot.game_time,
                briefing: &briefing,
                actors: &actors,
            })
            .await?;
        let ruling = validate_decision(
            decision,
            &ValidationContext {
                graph: &graph,
                scene_state: &scene_state,
                game_time: &snapshot.game_time,
                participants: &participants,
                default_elapsed_minutes: self.default_elapsed_minutes,
            },
        );
        timings.record("director", started.elapsed());
        if let Some(reason) = &ruling.decision.blocking_reason {
            tracing::info!(reason = %reason, "Director proposal refused by the story graph");
        }

        // 5. Next state, published as a fork of the source
        let started = Instant::now();
        let applied = apply_turn(&TurnDelta {
            snapshot: &snapshot,
            scene_state: &scene_state,
            graph: &graph,
            participants: &participants,
            reactions: &reactions,
            ruling: &ruling,
            instruction: request.instruction.trim(),
            recorded_at: self.clock.now(),
        });
        let new_step = self
            .saves
            .commit_turn(theme, from, applied.contents.clone())
            .await?;
        timings.record("save", started.elapsed());

        // 6. Player-facing result
        let started = Instant::now();
        let mut response = format_turn(&TurnReport {
            turn_id,
            graph: &graph,
            participants: &participants,
            reactions: &reactions,
            ruling: &ruling,
            applied: &applied,
            new_step,
            timings: &timings,
        });
        response.step_timings.push(storyloom_shared::StepTimingDto {
            step: "format".to_string(),
            millis: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        });

        tracing::info!(
            from_step = %from,
            new_step = %new_step,
            location = %applied.contents.scene_state.location(),
            event = ?ruling.event.as_ref().map(|e| e.id.to_string()),
            "Turn committed"
        );
        Ok(response)
    }

    async fn load_graph(&self, theme: &ThemeId) -> Result<StoryGraph, TurnError> {
        self.graphs.load(theme).await.map_err(|e| {
            if e.is_not_found() {
                TurnError::ThemeNotFound(theme.clone())
            } else {
                TurnError::Repo(e)
            }
        })
    }

    /// The snapshot to play from. A save line with no snapshots at all is
    /// seeded with `0_step` first.
    async fn resolve_step(&self, theme: &ThemeId, requested: Option<SaveStep>) -> Result<SaveStep, TurnError> {
        let steps = self.saves.list_steps(theme).await?;
        if steps.is_empty() && requested.unwrap_or(SaveStep::INITIAL).is_initial() {
            tracing::info!(theme = %theme, "Save line is empty, initializing 0_step");
            return Ok(self.initialize.execute(theme).await?);
        }

        match requested {
            Some(step) if steps.contains(&step) => Ok(step),
            Some(step) => Err(TurnError::StepNotFound {
                theme: theme.clone(),
                step,
            }),
            None => steps.last().copied().ok_or_else(|| TurnError::StepNotFound {
                theme: theme.clone(),
                step: SaveStep::INITIAL,
            }),
        }
    }

    fn briefing(
        &self,
        graph: &StoryGraph,
        snapshot: &Snapshot,
        scene_state: &SceneState,
        request: &TurnRequest,
    ) -> SceneBriefing {
        let location = scene_state.location();
        SceneBriefing {
            instruction: request.instruction.trim().to_string(),
            scene_text: graph.describe(&location),
            location_name: graph.location_names(&location).1,
            time: snapshot.game_time.to_string(),
            history: snapshot.history.recent(self.history_limit).to_vec(),
            player_role: request
                .player_role
                .clone()
                .filter(|role| !role.trim().is_empty())
                .or_else(|| graph.player_role.clone()),
        }
    }
}

/// Explicitly requested characters, else every character of the theme.
fn select_participants(snapshot: &Snapshot, request: &TurnRequest) -> Vec<CharacterRecord> {
    match request.character_ids.as_deref() {
        Some(ids) if !ids.is_empty() => ids
            .iter()
            .filter_map(|id| {
                let found = snapshot.character(id).cloned();
                if found.is_none() {
                    tracing::warn!(character = %id, "Requested character is not in the snapshot");
                }
                found
            })
            .collect(),
        _ => snapshot
            .characters
            .iter()
            .filter(|c| c.belongs_to(&request.theme))
            .cloned()
            .collect(),
    }
}
