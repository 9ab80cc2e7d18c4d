//! QuickPoll backend
//!
//! REST API for polls, options, votes and likes, plus a WebSocket endpoint
//! (`/ws`) that pushes the new state of a poll to every connected client
//! after each mutation.
//!
//! # Modules
//!
//! - `live`: connection registry, broadcaster and the WebSocket endpoint
//! - `db`: PostgreSQL pool, schema bootstrap and repositories
//! - `polls`: HTTP handlers for the `/api/polls` routes
//! - `startup`: shared state, router and background tasks
//! - `config`: environment configuration
//! - `error`: error types and their HTTP mapping

pub mod config;
pub mod db;
pub mod error;
pub mod live;
pub mod polls;
pub mod startup;

pub use config::Config;
pub use error::{ConfigError, PollError};
pub use live::{Broadcaster, LiveHub, PollEvent};
pub use startup::{AppState, create_router};
