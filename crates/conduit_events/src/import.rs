//! Importing an events CSV into an [`EventStore`].

use std::io::ErrorKind;
use std::path::Path;

use hashbrown::HashMap;
use uuid::Uuid;

use crate::error::ImportError;
use crate::reader::{AgentRow, EventReader};
use crate::store::{AgentId, EventStore};

/// Prefix of a file's original location inside its transfer.
pub const TRANSFER_DIRECTORY_TOKEN: &str = "%transferDirectory%";

/// An event created by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedEvent {
    /// The new event.
    pub event_id: Uuid,
    /// The CSV line it came from.
    pub line: u64,
}

/// A row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// The CSV line.
    pub line: u64,
    /// The filename the row named, if any.
    pub filename: Option<String>,
}

/// What an import did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Created events, in file order.
    pub imported: Vec<ImportedEvent>,
    /// Rows whose file is not part of the transfer.
    pub skipped: Vec<SkippedRow>,
}

/// Imports every row of the CSV at `path` as an event on a file of
/// `transfer`.
///
/// A missing CSV is not an error: the summary is empty. Agents are looked up
/// once per distinct set of fields.
///
/// # Errors
///
/// Returns [`ImportError`] if the file cannot be read, the CSV is malformed or
/// the store fails. Events created before the failure stay in the store.
pub async fn import_events(
    store: &dyn EventStore,
    transfer: Uuid,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no events CSV file found");
            return Ok(ImportSummary::default());
        }
        Err(err) => return Err(err.into()),
    };

    let mut summary = ImportSummary::default();
    let mut agent_cache: HashMap<AgentRow, AgentId> = HashMap::new();

    for row in EventReader::from_reader(bytes.as_slice())? {
        let row = row?;
        let Some(filename) = row.filename else {
            tracing::warn!(line = row.line, "row names no file");
            summary.skipped.push(SkippedRow {
                line: row.line,
                filename: None,
            });
            continue;
        };

        let original_location = format!("{TRANSFER_DIRECTORY_TOKEN}{filename}");
        let Some(file) = store.find_file(transfer, &original_location).await? else {
            tracing::warn!(line = row.line, filename = %filename, "referenced file not found");
            summary.skipped.push(SkippedRow {
                line: row.line,
                filename: Some(filename),
            });
            continue;
        };

        let mut agents = Vec::with_capacity(row.agents.len());
        for agent in row.agents {
            let id = match agent_cache.get(&agent) {
                Some(id) => *id,
                None => {
                    let id = store.get_or_create_agent(&agent).await?;
                    agent_cache.insert(agent, id);
                    id
                }
            };
            agents.push(id);
        }

        let event_id = store.create_event(file, &row.event, &agents).await?;
        tracing::info!(%event_id, path = %path.display(), line = row.line, "imported event");
        summary.imported.push(ImportedEvent {
            event_id,
            line: row.line,
        });
    }

    Ok(summary)
}
