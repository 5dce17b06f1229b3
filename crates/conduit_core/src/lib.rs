//! Ambient infrastructure for Conduit.
//!
//! - [`EngineConfig`] - engine settings loaded from code, JSON or the environment
//! - [`TracingSetup`] - installs the `tracing` subscriber

/// Engine configuration.
pub mod config;

/// Tracing subscriber setup.
pub mod tracing_setup;

pub use config::{ConfigError, EngineConfig};
pub use tracing_setup::{TracingFormat, TracingSetup};
