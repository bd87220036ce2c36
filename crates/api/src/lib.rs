//! HTTP API: configuration, routing, and the error boundary.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
pub mod validation;

pub use app::{AppState, build_app};
pub use config::{AppConfig, ConfigError, Environment};
