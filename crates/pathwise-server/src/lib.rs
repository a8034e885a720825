// ABOUTME: HTTP server for PathWise, exposing learning paths and user settings as a JSON API.
// ABOUTME: Every response reports whether it was served by the remote store or the local fallback.

pub mod api;
pub mod app_state;
pub mod config;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, LocalBackendKind, PathwiseConfig};
pub use routes::create_router;
