//! Preservation event import for Conduit.
//!
//! Transfers may carry a metadata CSV describing events that happened to
//! their files before ingest, and the agents involved. This crate reads that
//! file and records each event through an [`EventStore`](store::EventStore):
//!
//! - [`reader`] - Row parsing with agent grouping and timestamp handling
//! - [`import`] - File resolution, agent deduplication and event creation
//! - [`store`] - The storage trait and an in-memory implementation

/// Error types.
pub mod error;

/// Importing events into a store.
pub mod import;

/// CSV row parsing.
pub mod reader;

/// Event storage.
pub mod store;

pub use error::{EventStoreError, ImportError};
pub use import::{
    ImportSummary, ImportedEvent, SkippedRow, TRANSFER_DIRECTORY_TOKEN, import_events,
};
pub use reader::{AgentRow, EventFields, EventReader, EventRow};
pub use store::{AgentId, EventStore, InMemoryEventStore, StoredEvent};
