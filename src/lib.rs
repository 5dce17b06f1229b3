//! Chain-link workflow orchestration for digital-preservation processing.
//!
//! Units of work (transfers, SIPs, DIPs) travel through a graph of chains and
//! links. Links run tasks, set variables or stop at choice points where an
//! operator, an override document or stored settings pick what happens next.

pub use conduit_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use conduit_internal::prelude::*;
}
