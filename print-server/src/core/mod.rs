//! Core module - configuration, state, errors and background tasks
//!
//! - [`Config`] - CLI / environment configuration
//! - [`ServerState`] - shared handles for handlers and tasks
//! - [`Server`] - HTTP server and task supervision
//! - [`ServerError`] - startup and runtime errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Cli, CliCommand, Config, ConfigError};
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
