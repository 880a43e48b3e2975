//! Worker fan-out and fan-in.
//!
//! One task per participant, all joined before anything else happens. Each
//! task fills only its own character's slot, so the result does not depend
//! on completion order.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use storyloom_domain::{CharacterId, CharacterRecord};
use tokio::task::JoinSet;

use crate::infrastructure::ports::EscalationError;
use crate::use_cases::agents::{CharacterWorker, SceneBriefing, WorkerOutcome};
use crate::use_cases::director::ActorReport;

/// Every participant's outcome, keyed by character id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReactions {
    outcomes: BTreeMap<CharacterId, WorkerOutcome>,
}

impl TurnReactions {
    pub fn outcome(&self, id: &CharacterId) -> Option<&WorkerOutcome> {
        self.outcomes.get(id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn degraded_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_degraded()).count()
    }

    /// Participants paired with their outcomes, in participant order.
    pub fn actors<'a>(&'a self, participants: &'a [CharacterRecord]) -> Vec<ActorReport<'a>> {
        participants
            .iter()
            .filter_map(|character| {
                self.outcomes.get(&character.id).map(|outcome| ActorReport {
                    character,
                    outcome,
                })
            })
            .collect()
    }

    pub(super) fn insert(&mut self, id: CharacterId, outcome: WorkerOutcome) {
        self.outcomes.insert(id, outcome);
    }
}

/// Run one worker per participant concurrently and wait for all of them.
///
/// A panicking worker degrades like a failing one. An escalation from any
/// worker fails the whole fan-out once every task has finished.
pub async fn run_workers(
    worker: &Arc<CharacterWorker>,
    participants: &[CharacterRecord],
    briefing: &Arc<SceneBriefing>,
) -> Result<TurnReactions, EscalationError> {
    let mut tasks = JoinSet::new();
    for character in participants.iter().cloned() {
        let worker = Arc::clone(worker);
        let briefing = Arc::clone(briefing);
        tasks.spawn(async move {
            let outcome = AssertUnwindSafe(worker.react(&character, &briefing))
                .catch_unwind()
                .await;
            (character.id, outcome)
        });
    }

    let mut reactions = TurnReactions::default();
    let mut escalation = None;
    while let Some(joined) = tasks.join_next().await {
        let (id, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(error = %e, "Character worker task was lost");
                continue;
            }
        };
        match outcome {
            Ok(Ok(outcome)) => reactions.insert(id, outcome),
            Ok(Err(e)) => {
                escalation.get_or_insert(e);
            }
            Err(_) => {
                tracing::error!(character = %id, "Character worker panicked");
                reactions.insert(id, WorkerOutcome::degraded("character worker panicked"));
            }
        }
    }

    if let Some(e) = escalation {
        return Err(e);
    }

    // Every participant gets an entry, even if its task vanished
    for character in participants {
        if reactions.outcome(&character.id).is_none() {
            reactions.insert(
                character.id.clone(),
                WorkerOutcome::degraded("character worker did not report back"),
            );
        }
    }
    Ok(reactions)
}
