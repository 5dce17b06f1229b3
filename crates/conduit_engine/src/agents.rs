//! Operator-to-agent lookup.
//!
//! When an operator answers a decision, the agent that represents them is
//! recorded on the unit as the `activeAgent` variable.

use core::fmt;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::AgentLookupError;

/// Unit variable holding the agent of the last deciding operator.
pub const ACTIVE_AGENT_VARIABLE: &str = "activeAgent";

/// Identifier of an operator account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Resolves operator accounts to agent identifiers.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Returns the agent for `user`, or `None` if the user has no profile.
    async fn agent_for_user(&self, user: UserId) -> Result<Option<String>, AgentLookupError>;
}

/// In-memory [`AgentDirectory`].
#[derive(Debug, Default)]
pub struct InMemoryAgents {
    agents: RwLock<HashMap<UserId, String>>,
}

impl InMemoryAgents {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    #[must_use]
    pub fn with_agent(self, user: UserId, agent: impl Into<String>) -> Self {
        self.insert(user, agent);
        self
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: UserId, agent: impl Into<String>) {
        self.agents.write().insert(user, agent.into());
    }
}

#[async_trait]
impl AgentDirectory for InMemoryAgents {
    async fn agent_for_user(&self, user: UserId) -> Result<Option<String>, AgentLookupError> {
        Ok(self.agents.read().get(&user).cloned())
    }
}
