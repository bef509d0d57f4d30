//! Sonargate Core - quality gate resolution service
//!
//! Resolves the outcome of a code-quality analysis (compute task status and
//! quality gate verdict) from a remote quality server, and receives the
//! server's completion webhooks so waiting builds learn the result early.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod installation;
pub mod middleware;
pub mod server;
pub mod sonar;
pub mod state;
pub mod telemetry;
pub mod webhook;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
