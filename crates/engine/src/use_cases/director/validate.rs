//! Graph validation of Director proposals.
//!
//! Anything that does not hold up against the story graph is dropped and the
//! decision downgraded. Nothing here fails the turn.

use storyloom_domain::{
    select_event, AgentExecutionResult, CandidateEvent, CandidateMonster, CharacterRecord,
    DirectorDecision, EventId, GameTime, Location, MonsterId, PrerequisiteContext, SceneState,
    StoryGraph,
};

/// What the Director's decision is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub graph: &'a StoryGraph,
    pub scene_state: &'a SceneState,
    pub game_time: &'a GameTime,
    pub participants: &'a [CharacterRecord],
    pub default_elapsed_minutes: f64,
}

/// A decision that survived validation, with its proposals resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruling {
    /// At most one event, canonical monster ids, and a transition only if it
    /// is a reachable edge.
    pub decision: DirectorDecision,
    pub event: Option<CandidateEvent>,
    pub monsters: Vec<CandidateMonster>,
    pub destination: Option<Location>,
}

impl Ruling {
    /// A ruling that changes nothing beyond the passage of time.
    pub fn stays(decision: DirectorDecision) -> Self {
        Self {
            decision,
            event: None,
            monsters: Vec::new(),
            destination: None,
        }
    }
}

pub fn validate_decision(mut decision: DirectorDecision, ctx: &ValidationContext<'_>) -> Ruling {
    let location = ctx.scene_state.location();

    if !decision.elapsed_minutes.is_finite() || decision.elapsed_minutes < 0.0 {
        decision.elapsed_minutes = ctx.default_elapsed_minutes;
    }

    decision.agent_execution_results =
        adjudicated_participants(decision.agent_execution_results, ctx.participants);

    let event = choose_event(&mut decision, ctx, &location);
    let monsters = admit_monsters(&mut decision, ctx, &location);
    let destination = check_transition(&mut decision, ctx, &location, event.as_ref());

    Ruling {
        decision,
        event,
        monsters,
        destination,
    }
}

/// Keep one result per participant; results naming a character by display
/// name are mapped back to its id.
fn adjudicated_participants(
    results: Vec<AgentExecutionResult>,
    participants: &[CharacterRecord],
) -> Vec<AgentExecutionResult> {
    let mut kept: Vec<AgentExecutionResult> = Vec::with_capacity(results.len());
    for mut result in results {
        let participant = participants.iter().find(|p| p.id == result.character_id).or_else(|| {
            participants
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(result.character_id.as_str()))
        });
        let Some(participant) = participant else {
            tracing::debug!(character = %result.character_id, "Dropping result for a non-participant");
            continue;
        };
        if kept.iter().any(|k| k.character_id == participant.id) {
            continue;
        }
        result.character_id = participant.id.clone();
        kept.push(result);
    }
    kept
}

fn choose_event(
    decision: &mut DirectorDecision,
    ctx: &ValidationContext<'_>,
    location: &Location,
) -> Option<CandidateEvent> {
    let proposed = decision.proposed_events();
    decision.competing_event_ids.clear();
    if proposed.is_empty() {
        return None;
    }

    let triggered = &ctx.scene_state.triggered_event_ids;
    let eligible = ctx
        .graph
        .potential_events(location)
        .into_iter()
        .filter(|ranked| proposed.contains(&ranked.event.id))
        .filter(|ranked| ranked.event.is_available(triggered));

    let chosen = select_event(eligible).cloned();
    match &chosen {
        Some(event) => {
            if proposed.len() > 1 {
                tracing::info!(
                    chosen = %event.id,
                    proposed = proposed.len(),
                    "Several events proposed, only the highest priority fires"
                );
            }
            decision.trigger_event_id = Some(event.id.clone());
        }
        None => {
            tracing::debug!(proposed = ?proposed, location = %location, "No proposed event is eligible here");
            decision.trigger_event_id = None;
            decision.event_narration.clear();
        }
    }
    chosen
}

fn admit_monsters(
    decision: &mut DirectorDecision,
    ctx: &ValidationContext<'_>,
    location: &Location,
) -> Vec<CandidateMonster> {
    let candidates = ctx.graph.potential_monsters(location);
    let mut admitted: Vec<CandidateMonster> = Vec::new();
    for reference in &decision.appear_monsters {
        match candidates
            .iter()
            .find(|monster| monster.matches_reference(reference.as_str()))
        {
            Some(monster) if !admitted.iter().any(|m| m.id == monster.id) => {
                admitted.push((*monster).clone());
            }
            Some(_) => {}
            None => {
                tracing::debug!(monster = %reference, location = %location, "Discarding monster not bound here");
            }
        }
    }

    decision.appear_monsters = admitted.iter().map(|m| m.id.clone()).collect::<Vec<MonsterId>>();
    if admitted.is_empty() {
        decision.monster_narration.clear();
    }
    admitted
}

fn check_transition(
    decision: &mut DirectorDecision,
    ctx: &ValidationContext<'_>,
    location: &Location,
    event: Option<&CandidateEvent>,
) -> Option<Location> {
    let target = decision.transition_target.clone()?;

    let Some(connection) = ctx.graph.find_connection(location, &target) else {
        tracing::info!(target = %target, location = %location, "Discarding transition with no matching exit");
        return block(decision, format!("there is no way to '{target}' from here"));
    };

    if let Some(proposed_kind) = decision.transition_kind {
        if proposed_kind != connection.kind {
            tracing::debug!(
                target = %target,
                proposed = %proposed_kind,
                declared = %connection.kind,
                "Director named the wrong transition kind, using the graph's"
            );
        }
    }

    let mut triggered: Vec<EventId> = ctx.scene_state.triggered_event_ids.clone();
    if let Some(event) = event {
        if !triggered.contains(&event.id) {
            triggered.push(event.id.clone());
        }
    }
    let after_turn = ctx.game_time.advance_minutes(decision.elapsed_minutes);
    let prerequisite = PrerequisiteContext {
        triggered_events: &triggered,
        minutes_in_location: ctx.scene_state.minutes_in_location(&after_turn),
        any_action_succeeded: decision.any_action_succeeded(),
    };
    if let Err(reason) = connection.prerequisite.check(&prerequisite) {
        tracing::info!(target = %target, reason = %reason, "Transition blocked by its prerequisite");
        return block(decision, reason);
    }

    match ctx.graph.resolve_target(connection) {
        Ok(destination) => {
            decision.transition_target = Some(connection.target.clone());
            decision.transition_kind = Some(connection.kind);
            Some(destination)
        }
        Err(e) => {
            tracing::warn!(target = %target, error = %e, "Exit points outside the story graph");
            block(decision, e.to_string())
        }
    }
}

fn block(decision: &mut DirectorDecision, reason: String) -> Option<Location> {
    decision.transition_target = None;
    decision.transition_kind = None;
    decision.blocking_reason = Some(reason);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use storyloom_domain::{CharacterId, RoomId, SceneId, TransitionKind};

    struct Setup {
        graph: StoryGraph,
        state: SceneState,
        time: GameTime,
        crew: Vec<CharacterRecord>,
    }

    impl Setup {
        fn new() -> Self {
            let contents = test_fixtures::initial_contents();
            Self {
                graph: test_fixtures::vault_graph(),
                state: contents.scene_state,
                time: contents.game_time,
                crew: contents.characters,
            }
        }

        fn at_vault(mut self) -> Self {
            self.state.enter(
                Location::AtRoom {
                    scene: SceneId::new("scene_001"),
                    room: RoomId::new("room_001_001"),
                },
                &self.time,
            );
            self
        }

        fn validate(&self, decision: DirectorDecision) -> Ruling {
            validate_decision(
                decision,
                &ValidationContext {
                    graph: &self.graph,
                    scene_state: &self.state,
                    game_time: &self.time,
                    participants: &self.crew,
                    default_elapsed_minutes: 1.0,
                },
            )
        }
    }

    fn success_for(id: &str) -> AgentExecutionResult {
        AgentExecutionResult {
            character_id: CharacterId::new(id),
            success: true,
            failure_reason: None,
            actual_outcome: "It works.".into(),
            attribute_changes: Default::default(),
        }
    }

    #[test]
    fn valid_room_edge_is_kept() {
        let setup = Setup::new();
        let mut decision = DirectorDecision::default();
        decision.transition_target = Some("room_001_001".into());
        decision.transition_kind = Some(TransitionKind::Room);

        let ruling = setup.validate(decision);
        assert_eq!(
            ruling.destination,
            Some(Location::AtRoom {
                scene: SceneId::new("scene_001"),
                room: RoomId::new("room_001_001"),
            })
        );
        assert!(ruling.decision.blocking_reason.is_none());
    }

    #[test]
    fn unknown_edge_is_discarded() {
        let setup = Setup::new();
        let mut decision = DirectorDecision::default();
        decision.transition_target = Some("room_009_009".into());

        let ruling = setup.validate(decision);
        assert!(ruling.destination.is_none());
        assert!(ruling.decision.transition_target.is_none());
        assert!(ruling.decision.blocking_reason.is_some());
    }

    #[test]
    fn graph_kind_wins_over_proposed_kind() {
        let setup = Setup::new();
        let mut decision = DirectorDecision::default();
        decision.transition_target = Some("room_001_001".into());
        decision.transition_kind = Some(TransitionKind::Scene);

        let ruling = setup.validate(decision);
        assert_eq!(ruling.decision.transition_kind, Some(TransitionKind::Room));
        assert!(ruling.destination.is_some());
    }

    #[test]
    fn gated_exit_needs_a_successful_action() {
        let setup = Setup::new().at_vault();
        let mut decision = DirectorDecision::default();
        decision.transition_target = Some("scene_002".into());

        let blocked = setup.validate(decision.clone());
        assert!(blocked.destination.is_none());
        assert!(blocked.decision.blocking_reason.is_some());

        decision.agent_execution_results = vec![success_for("char_001")];
        let open = setup.validate(decision);
        assert_eq!(
            open.destination,
            Some(Location::AtScene {
                scene: SceneId::new("scene_002")
            })
        );
    }

    #[test]
    fn only_one_event_fires() {
        let setup = Setup::new().at_vault();
        let mut decision = DirectorDecision::default();
        decision.trigger_event_id = Some(EventId::new("coin_spill"));
        decision.competing_event_ids = vec![EventId::new("vault_alarm")];

        let ruling = setup.validate(decision);
        // Core beats random regardless of proposal order
        assert_eq!(ruling.decision.trigger_event_id, Some(EventId::new("vault_alarm")));
        assert!(ruling.decision.competing_event_ids.is_empty());
        assert_eq!(ruling.event.unwrap().id, EventId::new("vault_alarm"));
    }

    #[test]
    fn fired_events_are_not_proposed_again() {
        let mut setup = Setup::new();
        setup.state.record_event(EventId::new("vault_alarm"));
        let mut decision = DirectorDecision::default();
        decision.trigger_event_id = Some(EventId::new("vault_alarm"));
        decision.event_narration = "The alarm rings again.".into();

        let ruling = setup.validate(decision);
        assert!(ruling.event.is_none());
        assert!(ruling.decision.trigger_event_id.is_none());
        assert!(ruling.decision.event_narration.is_empty());
    }

    #[test]
    fn events_of_other_locations_are_rejected() {
        let setup = Setup::new();
        let mut decision = DirectorDecision::default();
        decision.trigger_event_id = Some(EventId::new("coin_spill"));

        assert!(setup.validate(decision).event.is_none());
    }

    #[test]
    fn monsters_are_canonicalized_and_filtered() {
        let setup = Setup::new();
        let mut decision = DirectorDecision::default();
        decision.appear_monsters = vec![
            MonsterId::new("night guard"),
            MonsterId::new("night_guard"),
            MonsterId::new("dragon"),
        ];

        let ruling = setup.validate(decision);
        assert_eq!(ruling.decision.appear_monsters, vec![MonsterId::new("night_guard")]);
        assert_eq!(ruling.monsters.len(), 1);
    }

    #[test]
    fn results_are_keyed_by_participant() {
        let setup = Setup::new();
        let mut decision = DirectorDecision::default();
        decision.agent_execution_results = vec![
            success_for("Mira"),
            success_for("char_001"),
            success_for("char_404"),
        ];

        let ruling = setup.validate(decision);
        let ids: Vec<&str> = ruling
            .decision
            .agent_execution_results
            .iter()
            .map(|r| r.character_id.as_str())
            .collect();
        assert_eq!(ids, vec!["char_001"]);
    }

    #[test]
    fn invalid_elapsed_time_uses_the_default() {
        let setup = Setup::new();
        let mut decision = DirectorDecision::default();
        decision.elapsed_minutes = f64::NAN;
        assert_eq!(setup.validate(decision).decision.elapsed_minutes, 1.0);
    }
}
