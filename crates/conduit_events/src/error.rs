//! Error types for event import.

/// A failure reported by an [`EventStore`](crate::store::EventStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event store error: {0}")]
pub struct EventStoreError(pub String);

/// Errors that abort an import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The CSV file could not be read.
    #[error("could not read events file: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV data is malformed.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The store rejected a lookup or write.
    #[error(transparent)]
    Store(#[from] EventStoreError),
}
