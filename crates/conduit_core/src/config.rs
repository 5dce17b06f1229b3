//! Engine configuration.
//!
//! [`EngineConfig`] is plain data. It can be built in code with the `with_*`
//! methods, deserialized from JSON, or read from `CONDUIT_*` environment
//! variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CONDUIT_SHARED_DIRECTORY` | [`shared_directory`](EngineConfig::shared_directory) |
//! | `CONDUIT_PROCESSING_CONFIG` | [`processing_config_file`](EngineConfig::processing_config_file) |
//! | `CONDUIT_MAX_LINKS` | [`max_links_per_run`](EngineConfig::max_links_per_run) (`0` disables the budget) |
//! | `CONDUIT_CHOICE_ALIASES` | [`choice_aliases`](EngineConfig::choice_aliases), as a JSON object |

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default location of the shared processing directory.
pub const DEFAULT_SHARED_DIRECTORY: &str = "/var/archivematica/sharedDirectory/";

/// Default file name of the per-unit override document.
pub const DEFAULT_PROCESSING_CONFIG: &str = "processingMCP.xml";

/// Default number of links a single driver run may execute.
pub const DEFAULT_MAX_LINKS: usize = 10_000;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be deserialized.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment variable held an unusable value.
    #[error("invalid value for {var}: {reason}")]
    InvalidVar {
        /// Variable name.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Settings consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Replaces the `%sharedPath%` token in unit locations.
    pub shared_directory: PathBuf,
    /// File name of the override document inside a unit's directory.
    pub processing_config_file: String,
    /// Choice-point aliases: an obsolete link identifier mapped to the link
    /// that replaced it. Applied to replacement-dictionary lookups.
    pub choice_aliases: BTreeMap<String, String>,
    /// Maximum links one driver run executes before failing the chain.
    /// `None` disables the budget.
    pub max_links_per_run: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shared_directory: PathBuf::from(DEFAULT_SHARED_DIRECTORY),
            processing_config_file: DEFAULT_PROCESSING_CONFIG.to_owned(),
            choice_aliases: BTreeMap::new(),
            max_links_per_run: Some(DEFAULT_MAX_LINKS),
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shared directory.
    #[must_use]
    pub fn with_shared_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.shared_directory = path.into();
        self
    }

    /// Sets the override document file name.
    #[must_use]
    pub fn with_processing_config_file(mut self, name: impl Into<String>) -> Self {
        self.processing_config_file = name.into();
        self
    }

    /// Adds a choice-point alias.
    #[must_use]
    pub fn with_choice_alias(
        mut self,
        alias: impl Into<String>,
        canonical: impl Into<String>,
    ) -> Self {
        self.choice_aliases.insert(alias.into(), canonical.into());
        self
    }

    /// Sets the per-run link budget.
    #[must_use]
    pub fn with_max_links_per_run(mut self, limit: Option<usize>) -> Self {
        self.max_links_per_run = limit;
        self
    }

    /// Returns the canonical identifier for a choice point or choice.
    #[must_use]
    pub fn canonical_choice<'a>(&'a self, id: &'a str) -> &'a str {
        self.choice_aliases.get(id).map_or(id, String::as_str)
    }

    /// Parses a JSON document. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the process environment on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVar`] if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads variables through `lookup` on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVar`] if a variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("CONDUIT_SHARED_DIRECTORY") {
            config.shared_directory = PathBuf::from(dir);
        }
        if let Some(name) = lookup("CONDUIT_PROCESSING_CONFIG") {
            config.processing_config_file = name;
        }
        if let Some(raw) = lookup("CONDUIT_MAX_LINKS") {
            let limit: usize = raw.trim().parse().map_err(|err| ConfigError::InvalidVar {
                var: "CONDUIT_MAX_LINKS",
                reason: format!("{err}"),
            })?;
            config.max_links_per_run = (limit > 0).then_some(limit);
        }
        if let Some(raw) = lookup("CONDUIT_CHOICE_ALIASES") {
            config.choice_aliases =
                serde_json::from_str(&raw).map_err(|err| ConfigError::InvalidVar {
                    var: "CONDUIT_CHOICE_ALIASES",
                    reason: err.to_string(),
                })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.shared_directory, PathBuf::from(DEFAULT_SHARED_DIRECTORY));
        assert_eq!(config.processing_config_file, "processingMCP.xml");
        assert_eq!(config.max_links_per_run, Some(10_000));
        assert!(config.choice_aliases.is_empty());
    }

    #[test]
    fn canonical_choice_follows_alias() {
        let config = EngineConfig::new().with_choice_alias("old", "new");
        assert_eq!(config.canonical_choice("old"), "new");
        assert_eq!(config.canonical_choice("other"), "other");
    }

    #[test]
    fn json_keeps_defaults_for_missing_fields() {
        let config = EngineConfig::from_json(r#"{"shared_directory": "/srv/shared"}"#).unwrap();
        assert_eq!(config.shared_directory, PathBuf::from("/srv/shared"));
        assert_eq!(config.processing_config_file, DEFAULT_PROCESSING_CONFIG);
    }

    #[test]
    fn env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("CONDUIT_SHARED_DIRECTORY", "/tmp/shared"),
            ("CONDUIT_PROCESSING_CONFIG", "custom.xml"),
            ("CONDUIT_MAX_LINKS", "0"),
            ("CONDUIT_CHOICE_ALIASES", r#"{"a": "b"}"#),
        ]))
        .unwrap();

        assert_eq!(config.shared_directory, PathBuf::from("/tmp/shared"));
        assert_eq!(config.processing_config_file, "custom.xml");
        assert_eq!(config.max_links_per_run, None);
        assert_eq!(config.canonical_choice("a"), "b");
    }

    #[test]
    fn env_rejects_bad_limit() {
        let err = EngineConfig::from_lookup(lookup_from(&[("CONDUIT_MAX_LINKS", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar { var: "CONDUIT_MAX_LINKS", .. }
        ));
    }
}
