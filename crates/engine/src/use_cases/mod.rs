//! Use cases - player and operator stories orchestrated across ports.
//!
//! - `turn`: one instruction in, one new snapshot out
//! - `saves`: create, inspect, fork and prune save lines
//! - `agents` and `director`: the two Oracle call sites of a turn
//! - `oracle_text`: pure normalization of generated text

pub mod agents;
pub mod director;
pub mod oracle_text;
pub mod saves;
pub mod turn;

pub use saves::{SaveError, SaveUseCases};
pub use turn::{TurnError, TurnRequest, TurnUseCases};
