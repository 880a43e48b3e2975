//! Turn result for the player (surface) and for operators (hidden).

use std::time::Duration;

use storyloom_domain::{CharacterRecord, SaveStep, StoryGraph};
use storyloom_shared::{
    CharacterResponseDto, DecisionMetadataDto, DecisionPointDto, EnvironmentStatusDto,
    ExecutionResultDto, HiddenDto, LocationStatusDto, RawResponseDto, StepTimingDto, SurfaceDto,
    TransitionDto, TurnResponse,
};

use super::aggregate::TurnReactions;
use super::apply::AppliedTurn;
use crate::infrastructure::turn_id::TurnId;
use crate::use_cases::agents::WorkerOutcome;
use crate::use_cases::director::Ruling;

/// Wall-clock time spent in each pipeline step, in execution order.
#[derive(Debug, Clone, Default)]
pub struct StepTimings(Vec<(&'static str, Duration)>);

impl StepTimings {
    pub fn record(&mut self, step: &'static str, elapsed: Duration) {
        self.0.push((step, elapsed));
    }

    fn to_dtos(&self) -> Vec<StepTimingDto> {
        self.0
            .iter()
            .map(|(step, elapsed)| StepTimingDto {
                step: (*step).to_string(),
                millis: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            })
            .collect()
    }
}

pub struct TurnReport<'a> {
    pub turn_id: &'a TurnId,
    pub graph: &'a StoryGraph,
    pub participants: &'a [CharacterRecord],
    pub reactions: &'a TurnReactions,
    pub ruling: &'a Ruling,
    pub applied: &'a AppliedTurn,
    pub new_step: SaveStep,
    pub timings: &'a StepTimings,
}

pub fn format_turn(report: &TurnReport<'_>) -> TurnResponse {
    let decision = &report.ruling.decision;
    let contents = &report.applied.contents;
    let location = contents.scene_state.location();
    let (region, specific_location) = report.graph.location_names(&location);

    let actors = report.reactions.actors(report.participants);
    let responses = actors
        .iter()
        .map(|actor| CharacterResponseDto {
            character_id: actor.character.id.to_string(),
            name: actor.character.display_name().to_string(),
            dialogue: actor.outcome.dialogue(),
            action: actor.outcome.action_intent().to_string(),
            degraded: actor.outcome.is_degraded(),
        })
        .collect();

    let raw_responses = actors
        .iter()
        .map(|actor| match actor.outcome {
            WorkerOutcome::Reacted(reaction) => RawResponseDto {
                character_id: actor.character.id.to_string(),
                inner_monologue: reaction.inner_monologue.clone(),
                error: None,
            },
            WorkerOutcome::Degraded { reason } => RawResponseDto {
                character_id: actor.character.id.to_string(),
                inner_monologue: String::new(),
                error: Some(reason.clone()),
            },
        })
        .collect();

    let execution_results = decision
        .agent_execution_results
        .iter()
        .map(|result| ExecutionResultDto {
            character_id: result.character_id.to_string(),
            success: result.success,
            failure_reason: result.failure_reason.clone(),
            actual_outcome: result.actual_outcome.clone(),
        })
        .collect();

    let current_narrative = contents
        .scene_state
        .state_changes
        .get("current_narrative")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    TurnResponse {
        turn_id: report.turn_id.to_string(),
        surface: SurfaceDto {
            responses,
            summary: report.applied.summary.clone(),
            environment_status: EnvironmentStatusDto {
                time: contents.game_time.to_string(),
                location: LocationStatusDto {
                    region,
                    specific_location,
                },
                scene_description: report.graph.describe(&location),
                current_narrative,
                changes_summary: report.applied.changes.clone(),
            },
            decision_points: DecisionPointDto {
                has_decision: decision.decision_point.has_decision,
                description: decision.decision_point.description.clone(),
                options: decision.decision_point.options.clone(),
            },
        },
        hidden: HiddenDto {
            execution_results,
            raw_responses,
            reasoning: decision.reasoning.clone(),
        },
        decision: DecisionMetadataDto {
            triggered_event: report.ruling.event.as_ref().map(|e| e.id.to_string()),
            appeared_monsters: decision.appear_monsters.iter().map(|m| m.to_string()).collect(),
            transition: decision
                .transition_target
                .as_ref()
                .zip(decision.transition_kind)
                .map(|(target, kind)| TransitionDto {
                    target: target.clone(),
                    kind: kind.to_string(),
                }),
            blocked: decision.blocking_reason.clone(),
            elapsed_minutes: decision.elapsed_minutes,
        },
        new_step: report.new_step.to_string(),
        step_timings: report.timings.to_dtos(),
    }
}
