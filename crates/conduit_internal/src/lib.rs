//! # Conduit Internal Library
//!
//! Re-exports the core Conduit crates for convenience.

/// Configuration and tracing setup.
pub use conduit_core;

/// The workflow graph.
pub use conduit_workflow;

/// Chain execution and choice coordination.
pub use conduit_engine;

/// Preservation event import.
pub use conduit_events;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use conduit_core::{EngineConfig, TracingFormat, TracingSetup};
    pub use conduit_engine::prelude::*;
    pub use conduit_workflow::prelude::*;
}
