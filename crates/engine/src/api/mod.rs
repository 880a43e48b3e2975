//! API layer - HTTP entry points of the Turn API.

pub mod http;
