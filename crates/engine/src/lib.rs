//! Storyloom Engine library.
//!
//! Turn pipeline, save versioning and the Turn API server.
//!
//! ## Structure
//!
//! - `use_cases/` - turn coordination and save-line management
//! - `infrastructure/` - external dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Sample theme and scripted Oracle shared by the unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
