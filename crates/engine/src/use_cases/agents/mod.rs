//! Character workers.
//!
//! One worker call per participating character per turn. A worker proposes
//! what its character says and attempts; it never decides whether the
//! attempt works. That is the Director's job.

mod prompt;
mod worker;

pub use worker::{CharacterWorker, SceneBriefing, WorkerOutcome, WorkerReaction};
