//! Small pure helpers shared by the domain types and the engine.
//!
//! No I/O lives here; everything operates on strings and `serde_json` values.

pub mod json;
pub mod string;

pub use json::deep_merge;
pub use string::{none_if_blank, optional_token};
