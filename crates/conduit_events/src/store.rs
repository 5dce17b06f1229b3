//! Persistence seam for imported events.

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::EventStoreError;
use crate::reader::{AgentRow, EventFields};

/// Identifier of a stored agent.
pub type AgentId = u64;

/// Where events and agents are kept.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Finds a file of `transfer` by its original location.
    async fn find_file(
        &self,
        transfer: Uuid,
        original_location: &str,
    ) -> Result<Option<Uuid>, EventStoreError>;

    /// Returns the agent with exactly these fields, creating it if needed.
    async fn get_or_create_agent(&self, agent: &AgentRow) -> Result<AgentId, EventStoreError>;

    /// Creates an event on `file` linked to `agents` and returns its id.
    async fn create_event(
        &self,
        file: Uuid,
        event: &EventFields,
        agents: &[AgentId],
    ) -> Result<Uuid, EventStoreError>;
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Event id.
    pub id: Uuid,
    /// The file.
    pub file: Uuid,
    /// The event fields.
    pub fields: EventFields,
    /// Linked agents.
    pub agents: Vec<AgentId>,
}

#[derive(Debug, Default)]
struct Tables {
    files: HashMap<(Uuid, String), Uuid>,
    agents: Vec<AgentRow>,
    events: Vec<StoredEvent>,
}

/// Keeps files, agents and events in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    tables: Mutex<Tables>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file of `transfer` and returns its id.
    pub fn add_file(&self, transfer: Uuid, original_location: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.tables
            .lock()
            .files
            .insert((transfer, original_location.into()), id);
        id
    }

    /// Every stored event, in creation order.
    #[must_use]
    pub fn events(&self) -> Vec<StoredEvent> {
        self.tables.lock().events.clone()
    }

    /// Every stored agent; an agent's id is its index.
    #[must_use]
    pub fn agents(&self) -> Vec<AgentRow> {
        self.tables.lock().agents.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn find_file(
        &self,
        transfer: Uuid,
        original_location: &str,
    ) -> Result<Option<Uuid>, EventStoreError> {
        Ok(self
            .tables
            .lock()
            .files
            .get(&(transfer, original_location.to_owned()))
            .copied())
    }

    async fn get_or_create_agent(&self, agent: &AgentRow) -> Result<AgentId, EventStoreError> {
        let mut tables = self.tables.lock();
        let index = match tables.agents.iter().position(|known| known == agent) {
            Some(index) => index,
            None => {
                tables.agents.push(agent.clone());
                tables.agents.len() - 1
            }
        };
        AgentId::try_from(index).map_err(|err| EventStoreError(err.to_string()))
    }

    async fn create_event(
        &self,
        file: Uuid,
        event: &EventFields,
        agents: &[AgentId],
    ) -> Result<Uuid, EventStoreError> {
        let id = Uuid::new_v4();
        self.tables.lock().events.push(StoredEvent {
            id,
            file,
            fields: event.clone(),
            agents: agents.to_vec(),
        });
        Ok(id)
    }
}
