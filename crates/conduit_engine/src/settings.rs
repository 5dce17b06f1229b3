//! Stored settings consulted by replacement-dictionary links.

use async_trait::async_trait;
use hashbrown::HashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::SettingsError;

/// Key-value settings grouped by scope.
///
/// A replacement-dictionary link that offers no choices reads the scope
/// named by its fallback task's `execute` key.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns every setting in `scope`; an unknown scope is empty.
    async fn get_dict(&self, scope: &str) -> Result<IndexMap<String, String>, SettingsError>;
}

/// In-memory [`SettingsStore`].
#[derive(Debug, Default)]
pub struct InMemorySettings {
    scopes: RwLock<HashMap<String, IndexMap<String, String>>>,
}

impl InMemorySettings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scope.
    #[must_use]
    pub fn with_scope<I, K, V>(self, scope: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.set(scope, values);
        self
    }

    /// Replaces a scope.
    pub fn set<I, K, V>(&self, scope: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.scopes.write().insert(scope.into(), values);
    }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
    async fn get_dict(&self, scope: &str) -> Result<IndexMap<String, String>, SettingsError> {
        Ok(self.scopes.read().get(scope).cloned().unwrap_or_default())
    }
}
