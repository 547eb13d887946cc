//! Tape Server Library
//!
//! Audio clip sharing server: session-token auth with a single active session
//! per user, time-limited share tickets, and a streaming relay in front of a
//! remote blob store.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use api::router;
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use services::{AudioLibrary, SessionGuard, ShareService, StreamRelay, TokenService};
pub use state::{AppState, Stores};
